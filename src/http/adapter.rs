//! Conversions between `hyper` messages and the crate's HTTP shapes.
//!
//! A host built on `hyper` calls [`handle`] from its `service_fn`; the
//! listener loop itself belongs to the host.

use super::{FezzRequest, FezzResponse, Method, StatusCode};
use crate::config::HostConfig;
use crate::dispatch::Dispatcher;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{Request, Response};
use std::collections::HashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Failure to turn a `hyper` request into a [`FezzRequest`].
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The body exceeded the configured limit.
    #[error("request body too large (limit {limit} bytes)")]
    BodyTooLarge {
        /// Configured limit.
        limit: usize,
    },
    /// The body stream failed.
    #[error("failed to read request body: {0}")]
    Body(String),
}

/// Route a `hyper` request to the request handler named by its first path
/// segment (`/{handler}/rest`) and render the outcome.
///
/// Never fails: conversion problems become 400, unknown handlers 404.
pub async fn handle<B>(
    dispatcher: &Dispatcher,
    req: Request<B>,
    config: &HostConfig,
    cancel: CancellationToken,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    let (name, sub_path) = split_handler_path(&path);

    if name.is_empty() {
        return build_response(FezzResponse::error(
            StatusCode::NOT_FOUND,
            "No handler specified",
        ));
    }

    let request = match into_fezz_request(req, &sub_path, config.max_body_size).await {
        Ok(request) => request,
        Err(e) => {
            warn!(handler = %name, error = %e, "failed to convert request");
            return build_response(FezzResponse::error(StatusCode::BAD_REQUEST, e.to_string()));
        }
    };

    debug!(handler = %name, method = %request.method, path = %request.url, "routing request");
    let outcome = dispatcher.dispatch_request(&name, request, cancel).await;
    build_response(outcome.into_response())
}

/// Split `/orders/42` into `("orders", "/42")`.
fn split_handler_path(path: &str) -> (String, String) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((name, rest)) => (name.to_string(), format!("/{}", rest)),
        None => (trimmed.to_string(), "/".to_string()),
    }
}

/// Convert a `hyper` request, collecting its body.
pub async fn into_fezz_request<B>(
    req: Request<B>,
    path: &str,
    max_body_size: usize,
) -> Result<FezzRequest, AdapterError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = Method::from(req.method());
    let query = req
        .uri()
        .query()
        .map(super::request::parse_query)
        .unwrap_or_default();

    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_string(), v.to_string());
        }
    }

    let body_bytes = Limited::new(req.into_body(), max_body_size)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                AdapterError::BodyTooLarge {
                    limit: max_body_size,
                }
            } else {
                AdapterError::Body(e.to_string())
            }
        })?
        .to_bytes();

    Ok(FezzRequest {
        method,
        url: path.to_string(),
        query,
        headers,
        body: (!body_bytes.is_empty()).then_some(body_bytes),
    })
}

/// Build a `hyper` response from a [`FezzResponse`].
///
/// An unrepresentable status or header degrades to a bare 500.
pub fn build_response(fezz_response: FezzResponse) -> Response<Full<Bytes>> {
    let status = hyper::StatusCode::from_u16(fezz_response.status.0).unwrap_or_else(|_| {
        warn!(
            "Invalid status code {}, falling back to 500 Internal Server Error",
            fezz_response.status.0
        );
        hyper::StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = Response::builder().status(status);
    for (name, value) in fezz_response.headers {
        builder = builder.header(name, value);
    }

    let body = fezz_response.body.unwrap_or_default();
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        warn!(error = %e, "invalid response header, answering 500");
        let mut fallback = Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
