//! The host-facing dispatch entry point.
//!
//! The host calls one of the `dispatch_*` methods per trigger event. The
//! dispatcher finds the handler in the [`InvocationTable`], builds its
//! [`InvocationContext`] and hands both to the dispatch contract.

use crate::config::HostConfig;
use crate::error::DispatchError;
use crate::handler::context::generate_invocation_id;
use crate::handler::envelope::invocation_id_from;
use crate::handler::{DispatchOutcome, InboundEnvelope, InvocationContext};
use crate::http::FezzRequest;
use crate::registry::InvocationTable;
use crate::route::RouteDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, warn, Instrument};

/// Routes trigger events to registered handlers.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<InvocationTable>,
    env: Arc<HashMap<String, String>>,
}

impl Dispatcher {
    /// Create a dispatcher over a built table.
    pub fn new(table: InvocationTable) -> Self {
        Self {
            table: Arc::new(table),
            env: Arc::new(HashMap::new()),
        }
    }

    /// Copy the host's environment values into every invocation context.
    pub fn with_config(mut self, config: &HostConfig) -> Self {
        self.env = Arc::new(config.env.clone());
        self
    }

    /// The underlying table.
    pub fn table(&self) -> &InvocationTable {
        &self.table
    }

    /// Deliver a message to the handler registered as `name`.
    ///
    /// Failures are returned so the host can redeliver or dead-letter.
    pub async fn dispatch_message(
        &self,
        name: &str,
        envelope: InboundEnvelope,
        cancel: CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(entry) = self.table.message(name) else {
            warn!(handler = %name, "message for unknown handler");
            return Err(DispatchError::HandlerNotFound(name.to_string()));
        };

        let invocation_id = invocation_id_from(&envelope.metadata)
            .map(str::to_string)
            .unwrap_or_else(generate_invocation_id);
        let ctx = self
            .context(name, &invocation_id, envelope.metadata.clone(), cancel)
            .with_route(entry.route.clone());

        let span = info_span!("dispatch", handler = %name, invocation_id = %invocation_id, kind = "message");
        entry.handler.run(envelope, &ctx).instrument(span).await
    }

    /// Deliver a message arriving on `destination` / `group` to the first
    /// handler whose route serves it.
    pub async fn dispatch_subscription(
        &self,
        destination: &str,
        group: Option<&str>,
        envelope: InboundEnvelope,
        cancel: CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        match self.table.handler_for(destination, group) {
            Some(name) => self.dispatch_message(name, envelope, cancel).await,
            None => {
                let route = match group {
                    Some(group) => format!("{destination}/{group}"),
                    None => destination.to_string(),
                };
                warn!(%route, "message for unrouted destination");
                Err(DispatchError::HandlerNotFound(route))
            }
        }
    }

    /// Serve a request with the handler registered as `name`.
    ///
    /// Always yields a response: unknown handlers answer 404 and handler
    /// failures answer 500.
    pub async fn dispatch_request(
        &self,
        name: &str,
        request: FezzRequest,
        cancel: CancellationToken,
    ) -> DispatchOutcome {
        let invocation_id = invocation_id_from(&request.headers)
            .map(str::to_string)
            .unwrap_or_else(generate_invocation_id);

        let Some(handler) = self.table.request(name) else {
            warn!(handler = %name, invocation_id = %invocation_id, "request for unknown handler");
            return DispatchOutcome::not_found(name, invocation_id);
        };

        let ctx = self.context(name, &invocation_id, request.headers.clone(), cancel);
        let span = info_span!("dispatch", handler = %name, invocation_id = %invocation_id, kind = "request");
        handler.run(request, &ctx).instrument(span).await
    }

    /// Route of a registered message handler.
    pub fn route(&self, name: &str) -> Option<&RouteDescriptor> {
        self.table.route(name)
    }

    fn context(
        &self,
        name: &str,
        invocation_id: &str,
        metadata: HashMap<String, String>,
        cancel: CancellationToken,
    ) -> InvocationContext {
        let mut ctx = InvocationContext::new(name, invocation_id)
            .with_metadata(metadata)
            .with_cancellation(cancel);
        ctx.env = self.env.as_ref().clone();
        ctx
    }
}
