//! The per-invocation execution envelope around a business callback.
//!
//! Message path: `Started -> Decoded -> Invoked -> Completed | Failed`.
//! Failures are logged and returned so the host's redelivery and
//! dead-letter policy applies; nothing here retries.
//!
//! Request path: `Started -> Handled -> Responded | ErrorResponded`.
//! Failures are logged and rendered as a 500 with a fixed-shape body; an
//! HTTP caller always gets a response.

use super::{InboundEnvelope, InvocationContext, MessageHandler, RequestHandler};
use crate::codec::{Decoded, PayloadCodec};
use crate::error::{panic_message, DispatchError, FezzError};
use crate::http::{FezzRequest, FezzResponse, StatusCode};
use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

/// Fixed `error` field of request-path failure bodies.
pub const INTERNAL_ERROR_MARKER: &str = "An internal server error occurred.";

/// Stages of the dispatch state machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Started,
    Decoded,
    Invoked,
    Completed,
    Failed,
    Handled,
    Responded,
    ErrorResponded,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Started => "started",
            Stage::Decoded => "decoded",
            Stage::Invoked => "invoked",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
            Stage::Handled => "handled",
            Stage::Responded => "responded",
            Stage::ErrorResponded => "error_responded",
        };
        f.write_str(name)
    }
}

/// Terminal result of one invocation, handed back to the host.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Handler identity.
    pub handler: String,
    /// Invocation ID.
    pub invocation_id: String,
    /// Final stage reached.
    pub stage: Stage,
    /// Response for request invocations.
    pub response: Option<FezzResponse>,
    /// Failure absorbed on the request path.
    pub failure: Option<DispatchError>,
}

impl DispatchOutcome {
    fn completed(ctx: &InvocationContext) -> Self {
        Self {
            handler: ctx.handler_name.clone(),
            invocation_id: ctx.invocation_id.clone(),
            stage: Stage::Completed,
            response: None,
            failure: None,
        }
    }

    fn responded(
        ctx: &InvocationContext,
        stage: Stage,
        response: FezzResponse,
        failure: Option<DispatchError>,
    ) -> Self {
        Self {
            handler: ctx.handler_name.clone(),
            invocation_id: ctx.invocation_id.clone(),
            stage,
            response: Some(response),
            failure,
        }
    }

    /// 404 outcome for a request naming no registered handler.
    pub(crate) fn not_found(handler: &str, invocation_id: String) -> Self {
        Self {
            handler: handler.to_string(),
            invocation_id,
            stage: Stage::ErrorResponded,
            response: Some(FezzResponse::error(
                StatusCode::NOT_FOUND,
                format!("Handler '{handler}' not found"),
            )),
            failure: Some(DispatchError::HandlerNotFound(handler.to_string())),
        }
    }

    /// Whether the invocation succeeded.
    ///
    /// Request invocations that answered with a 5xx count as failed even
    /// when no error was raised.
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
            && self
                .response
                .as_ref()
                .map_or(true, |response| !response.status.is_server_error())
    }

    /// Response to hand to an HTTP host. Message outcomes answer a bare 200.
    pub fn into_response(self) -> FezzResponse {
        self.response.unwrap_or_else(FezzResponse::ok)
    }
}

/// Run a message handler over one envelope.
///
/// The callback runs only when the payload decodes to a value. Every
/// failure is logged with handler identity and returned to the caller.
pub async fn run_message<H, C>(
    handler: &H,
    envelope: InboundEnvelope,
    ctx: &InvocationContext,
) -> Result<DispatchOutcome, DispatchError>
where
    H: MessageHandler,
    C: PayloadCodec,
{
    let name = ctx.handler_name.as_str();
    info!(handler = %name, invocation_id = %ctx.invocation_id, stage = %Stage::Started, "message invocation started");

    let result = decode_and_invoke::<H, C>(handler, envelope, ctx).await;
    match result {
        Ok(()) => {
            info!(handler = %name, invocation_id = %ctx.invocation_id, stage = %Stage::Completed, "message invocation completed");
            Ok(DispatchOutcome::completed(ctx))
        }
        Err(err) => {
            error!(handler = %name, invocation_id = %ctx.invocation_id, stage = %Stage::Failed, error = %err, "message invocation failed");
            Err(err)
        }
    }
}

async fn decode_and_invoke<H, C>(
    handler: &H,
    envelope: InboundEnvelope,
    ctx: &InvocationContext,
) -> Result<(), DispatchError>
where
    H: MessageHandler,
    C: PayloadCodec,
{
    let name = ctx.handler_name.as_str();
    if ctx.is_cancelled() {
        return Err(DispatchError::Cancelled {
            handler: name.to_string(),
        });
    }

    let payload = match C::decode::<H::Payload>(envelope.raw_body.as_deref()) {
        Ok(Decoded::Value(payload)) => payload,
        Ok(Decoded::Empty) => {
            return Err(DispatchError::MessageDeserializationFailed {
                handler: name.to_string(),
                reason: "message payload is empty".to_string(),
                source: None,
            });
        }
        Err(err) => {
            warn!(handler = %name, invocation_id = %ctx.invocation_id, raw = %err.raw, reason = %err.message, "undecodable payload");
            return Err(DispatchError::MessageDeserializationFailed {
                handler: name.to_string(),
                reason: err.message.clone(),
                source: Some(err),
            });
        }
    };
    debug!(handler = %name, invocation_id = %ctx.invocation_id, stage = %Stage::Decoded, "payload decoded");

    debug!(handler = %name, invocation_id = %ctx.invocation_id, stage = %Stage::Invoked, "invoking handler");
    tokio::select! {
        biased;
        _ = ctx.cancellation.cancelled() => Err(DispatchError::Cancelled {
            handler: name.to_string(),
        }),
        result = AssertUnwindSafe(handler.handle(payload, ctx)).catch_unwind() => {
            callback_result(name, result)
        }
    }
}

/// Run a request handler and always produce a response.
pub async fn run_request<H, C>(
    handler: &H,
    request: FezzRequest,
    ctx: &InvocationContext,
) -> DispatchOutcome
where
    H: RequestHandler,
    C: PayloadCodec,
{
    let name = ctx.handler_name.as_str();
    info!(handler = %name, invocation_id = %ctx.invocation_id, stage = %Stage::Started, method = %request.method, path = %request.url, "request invocation started");

    let result = tokio::select! {
        biased;
        _ = ctx.cancellation.cancelled() => Err(DispatchError::Cancelled {
            handler: name.to_string(),
        }),
        result = AssertUnwindSafe(handler.handle(request, ctx)).catch_unwind() => {
            callback_result(name, result)
        }
    };

    let action = match result {
        Ok(action) => action,
        Err(err) => return error_responded::<C>(ctx, err),
    };
    let kind = action.kind().to_string();
    debug!(handler = %name, invocation_id = %ctx.invocation_id, stage = %Stage::Handled, result = %kind, "handler returned");

    match action.into_response::<C>() {
        Ok(response) => {
            if response.status.is_server_error() {
                error!(handler = %name, invocation_id = %ctx.invocation_id, result = %kind, status = %response.status, "handler produced a server error result");
            }
            info!(handler = %name, invocation_id = %ctx.invocation_id, stage = %Stage::Responded, status = %response.status, "request invocation responded");
            DispatchOutcome::responded(ctx, Stage::Responded, response, None)
        }
        Err(err) => error_responded::<C>(
            ctx,
            DispatchError::HandlerExecutionFailed {
                handler: name.to_string(),
                source: FezzError::new(err.message),
            },
        ),
    }
}

/// Map a callback result, or the panic it raised, to a dispatch result.
fn callback_result<T>(
    name: &str,
    result: std::thread::Result<Result<T, FezzError>>,
) -> Result<T, DispatchError> {
    let source = match result {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(source)) => source,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(handler = %name, panic = %message, "handler panicked");
            FezzError::new(format!("handler panicked: {message}"))
        }
    };
    Err(DispatchError::HandlerExecutionFailed {
        handler: name.to_string(),
        source,
    })
}

fn error_responded<C: PayloadCodec>(ctx: &InvocationContext, err: DispatchError) -> DispatchOutcome {
    error!(handler = %ctx.handler_name, invocation_id = %ctx.invocation_id, stage = %Stage::ErrorResponded, error = %err, "request invocation failed");

    let body = error_body(&err);
    let encoded = C::encode(&body).unwrap_or_else(|_| body.to_string());
    let response = FezzResponse::encoded(StatusCode::INTERNAL_SERVER_ERROR, C::CONTENT_TYPE, encoded);
    DispatchOutcome::responded(ctx, Stage::ErrorResponded, response, Some(err))
}

/// `{error, message, timestamp}` body for an absorbed request failure.
fn error_body(err: &DispatchError) -> serde_json::Value {
    let message = match err {
        DispatchError::HandlerExecutionFailed { source, .. } => source.message.clone(),
        other => other.to_string(),
    };
    json!({
        "error": INTERNAL_ERROR_MARKER,
        "message": message,
        "timestamp": utc_now(),
    })
}

fn utc_now() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
