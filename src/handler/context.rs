//! Per-invocation context handed to business callbacks.

use crate::route::RouteDescriptor;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Execution context for a single handler invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    /// Environment values made available to handlers by the host.
    pub env: HashMap<String, String>,
    /// Handler identity.
    pub handler_name: String,
    /// Invocation ID for tracing.
    pub invocation_id: String,
    /// Trigger metadata (message properties or request headers).
    pub metadata: HashMap<String, String>,
    /// Resolved route, for message handlers.
    pub route: Option<RouteDescriptor>,
    /// Cancellation signal from the host.
    pub cancellation: CancellationToken,
}

impl InvocationContext {
    /// Create a new invocation context.
    pub fn new(handler_name: impl Into<String>, invocation_id: impl Into<String>) -> Self {
        Self {
            handler_name: handler_name.into(),
            invocation_id: invocation_id.into(),
            ..Self::default()
        }
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Replace the trigger metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach the resolved route.
    pub fn with_route(mut self, route: RouteDescriptor) -> Self {
        self.route = Some(route);
        self
    }

    /// Attach the host's cancellation token.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Get an environment variable.
    pub fn get_env(&self, key: &str) -> Option<&String> {
        self.env.get(key)
    }

    /// Get a metadata entry.
    pub fn get_metadata(&self, key: &str) -> Option<&String> {
        self.metadata.get(key)
    }

    /// Whether the host has asked this invocation to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Generate an invocation ID from the current time.
pub(crate) fn generate_invocation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{:x}", timestamp)
}
