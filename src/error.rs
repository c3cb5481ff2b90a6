//! Error types shared by handlers, the dispatch contract and startup.

use crate::codec::DecodeError;
use crate::http::{FezzResponse, StatusCode};
use thiserror::Error;

/// Error returned by business callbacks.
///
/// Keeps a status-like `code` so request handlers can surface a meaningful
/// status when they choose to; the dispatch contract itself always renders
/// callback failures as 500.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FezzError {
    /// Error message.
    pub message: String,
    /// Error code.
    pub code: u16,
}

impl FezzError {
    /// Create a new FezzError.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 500,
        }
    }

    /// Create a FezzError with a specific code.
    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

impl std::fmt::Display for FezzError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for FezzError {}

impl From<FezzError> for FezzResponse {
    fn from(err: FezzError) -> Self {
        FezzResponse::error(StatusCode(err.code), err.message)
    }
}

impl From<serde_json::Error> for FezzError {
    fn from(err: serde_json::Error) -> Self {
        FezzError::with_code(400, err.to_string())
    }
}

/// Failures raised by the dispatch core.
///
/// Message-path variants are returned to the host so its redelivery and
/// dead-letter policy applies. Request-path failures never leave the core as
/// this type; they are rendered into a 500 response instead.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The message payload was empty or malformed; the callback never ran.
    #[error("message for handler '{handler}' could not be deserialized: {reason}")]
    MessageDeserializationFailed {
        /// Handler identity.
        handler: String,
        /// Why decoding failed.
        reason: String,
        /// Codec failure carrying the raw payload; `None` for an empty one.
        #[source]
        source: Option<DecodeError>,
    },

    /// The business callback returned an error.
    #[error("handler '{handler}' failed: {source}")]
    HandlerExecutionFailed {
        /// Handler identity.
        handler: String,
        /// Error returned by the callback.
        #[source]
        source: FezzError,
    },

    /// A single module could not be scanned during discovery.
    #[error("discovery could not scan module '{module}': {reason}")]
    DiscoveryScanFailed {
        /// Module name.
        module: String,
        /// Scan failure detail.
        reason: String,
    },

    /// Startup configuration failed validation.
    #[error("invalid configuration for '{key}': {reason}")]
    ConfigurationInvalid {
        /// Offending configuration key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The host cancelled the invocation before it finished.
    #[error("invocation of handler '{handler}' was cancelled")]
    Cancelled {
        /// Handler identity.
        handler: String,
    },

    /// No handler is registered under the requested identity or route.
    #[error("no handler registered for '{0}'")]
    HandlerNotFound(String),
}

impl DispatchError {
    /// Build a configuration error.
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Raw payload text of a malformed message, if any.
    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            Self::MessageDeserializationFailed {
                source: Some(source),
                ..
            } => Some(&source.raw),
            _ => None,
        }
    }

    /// Handler identity attached to this error, if any.
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::MessageDeserializationFailed { handler, .. }
            | Self::HandlerExecutionFailed { handler, .. }
            | Self::Cancelled { handler } => Some(handler),
            _ => None,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Message carried by a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panicked".to_string())
}
