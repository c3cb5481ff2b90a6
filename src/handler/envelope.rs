//! Inbound envelopes and handler kinds.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata keys consulted for an invocation ID, in order.
pub const INVOCATION_ID_KEYS: [&str; 3] = ["message-id", "x-request-id", "invocation-id"];

/// Which trigger a handler answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    /// HTTP request trigger.
    Request,
    /// Message-queue trigger.
    Message,
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerKind::Request => write!(f, "request"),
            HandlerKind::Message => write!(f, "message"),
        }
    }
}

/// A raw inbound message as delivered by the host.
///
/// Consumed by value: one envelope, one invocation.
#[derive(Debug, Clone)]
pub struct InboundEnvelope {
    /// Raw payload, if any.
    pub raw_body: Option<Bytes>,
    /// Message properties / invocation context from the broker.
    pub metadata: HashMap<String, String>,
    /// Trigger kind.
    pub kind: HandlerKind,
}

impl InboundEnvelope {
    /// A message envelope carrying `body`.
    pub fn message(body: impl Into<Bytes>) -> Self {
        Self {
            raw_body: Some(body.into()),
            metadata: HashMap::new(),
            kind: HandlerKind::Message,
        }
    }

    /// A message envelope with no payload at all.
    pub fn empty_message() -> Self {
        Self {
            raw_body: None,
            metadata: HashMap::new(),
            kind: HandlerKind::Message,
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Invocation ID carried in metadata, if the producer set one.
    pub fn invocation_id(&self) -> Option<&str> {
        invocation_id_from(&self.metadata)
    }
}

/// Find an invocation ID among well-known metadata keys (case-insensitive).
pub(crate) fn invocation_id_from(metadata: &HashMap<String, String>) -> Option<&str> {
    INVOCATION_ID_KEYS.iter().find_map(|wanted| {
        metadata
            .iter()
            .find(|(key, value)| key.eq_ignore_ascii_case(wanted) && !value.is_empty())
            .map(|(_, value)| value.as_str())
    })
}
