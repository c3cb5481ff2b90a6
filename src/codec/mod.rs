//! Payload codecs: raw message text to typed values and back.
//!
//! - [`JsonCodec`] - JSON via `serde_json`, matching field names case-insensitively
//!
//! # Design
//!
//! Codecs are marker types with static methods, bound to a handler when it
//! is registered (see
//! [`TypeInfo::message_with_codec`](crate::registry::TypeInfo::message_with_codec)). Decoding
//! distinguishes an *empty* payload ([`Decoded::Empty`]) from a *malformed*
//! one ([`DecodeError`]); callers branch on the former and report the latter.
//!
//! # Example
//!
//! ```
//! use fezz_dispatch::codec::{Decoded, JsonCodec, PayloadCodec};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! #[serde(rename_all = "camelCase")]
//! struct OrderCreated {
//!     order_id: String,
//! }
//!
//! let decoded: Decoded<OrderCreated> = JsonCodec::decode(Some(r#"{"OrderId":"42"}"#.as_bytes())).unwrap();
//! assert_eq!(decoded.into_value().unwrap().order_id, "42");
//!
//! let empty: Decoded<OrderCreated> = JsonCodec::decode(Some("  ".as_bytes())).unwrap();
//! assert!(empty.is_empty());
//! ```

mod fold;
mod json;

pub use json::JsonCodec;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A codec turning raw payload bytes into typed values and back.
///
/// Implementations must be pure: no I/O, no global state.
pub trait PayloadCodec: Send + Sync + 'static {
    /// Content type written on encoded response bodies.
    const CONTENT_TYPE: &'static str;

    /// Decode a raw payload.
    ///
    /// `None`, blank input and an explicit null yield [`Decoded::Empty`].
    fn decode<T: DeserializeOwned>(raw: Option<&[u8]>) -> Result<Decoded<T>, DecodeError>;

    /// Encode a value into its textual form.
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, EncodeError>;
}

/// Outcome of a successful decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    /// The payload carried a value.
    Value(T),
    /// The payload was absent, blank or null.
    Empty,
}

impl<T> Decoded<T> {
    /// Returns `true` for [`Decoded::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Decoded::Empty)
    }

    /// Take the decoded value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Decoded::Value(value) => Some(value),
            Decoded::Empty => None,
        }
    }
}

/// A payload that could not be parsed into the target shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decode payload: {message}")]
pub struct DecodeError {
    /// The offending raw text (lossy UTF-8).
    pub raw: String,
    /// Parser message.
    pub message: String,
}

impl DecodeError {
    /// Build a decode error from the raw input and the parser's complaint.
    pub fn new(raw: &[u8], cause: impl std::fmt::Display) -> Self {
        Self {
            raw: String::from_utf8_lossy(raw).into_owned(),
            message: cause.to_string(),
        }
    }
}

/// A value that could not be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to encode payload: {message}")]
pub struct EncodeError {
    /// Serializer message.
    pub message: String,
}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}
