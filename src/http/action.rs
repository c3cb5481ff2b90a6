//! Abstract results produced by request handlers.

use super::{FezzResponse, StatusCode};
use crate::codec::{EncodeError, PayloadCodec};
use serde::Serialize;
use serde_json::Value;

/// What a request handler wants to answer, before it becomes HTTP.
///
/// Bodies are held as JSON values and encoded with the dispatcher's codec
/// when the response is built.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// 200 with a body.
    Ok(Value),
    /// 200 without a body.
    OkEmpty,
    /// 400 with a body.
    BadRequest(Value),
    /// 404.
    NotFound,
    /// 401.
    Unauthorized,
    /// 403.
    Forbidden,
    /// Any status, optionally with a body.
    Status {
        /// Status code to answer with.
        code: u16,
        /// Optional body.
        body: Option<Value>,
    },
    /// A result shape this layer does not know how to render.
    /// Always answered with a bare 500.
    Unsupported {
        /// Name of the unrecognized shape, for logs.
        kind: String,
    },
}

impl ActionResult {
    /// 200 with a serialized body.
    pub fn ok<T: Serialize>(body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Ok(serde_json::to_value(body)?))
    }

    /// 400 with a serialized body.
    pub fn bad_request<T: Serialize>(body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::BadRequest(serde_json::to_value(body)?))
    }

    /// Custom status with a serialized body.
    pub fn status<T: Serialize>(code: u16, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Status {
            code,
            body: Some(serde_json::to_value(body)?),
        })
    }

    /// Short name of the variant, used in logs.
    pub fn kind(&self) -> &str {
        match self {
            Self::Ok(_) => "ok",
            Self::OkEmpty => "ok_empty",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Status { .. } => "status",
            Self::Unsupported { kind } => kind,
        }
    }

    /// Render into a concrete response, encoding any body with `C`.
    pub fn into_response<C: PayloadCodec>(self) -> Result<FezzResponse, EncodeError> {
        let (status, body) = match self {
            Self::Ok(body) => (StatusCode::OK, Some(body)),
            Self::OkEmpty => (StatusCode::OK, None),
            Self::BadRequest(body) => (StatusCode::BAD_REQUEST, Some(body)),
            Self::NotFound => (StatusCode::NOT_FOUND, None),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, None),
            Self::Forbidden => (StatusCode::FORBIDDEN, None),
            Self::Status { code, body } => (StatusCode(code), body),
            Self::Unsupported { .. } => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        match body {
            Some(body) => Ok(FezzResponse::encoded(
                status,
                C::CONTENT_TYPE,
                C::encode(&body)?,
            )),
            None => Ok(FezzResponse::new(status)),
        }
    }
}
