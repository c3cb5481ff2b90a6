//! The read-only table of instantiated handlers.

use super::{discover, Discovery, ErasedMessageHandler, ErasedRequestHandler, HandlerDescriptor};
use super::{HandlerFactory, TypeSource};
use crate::config::Settings;
use crate::error::DispatchError;
use crate::handler::HandlerKind;
use crate::route::{self, RouteDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub(crate) struct MessageEntry {
    pub(crate) handler: Arc<dyn ErasedMessageHandler>,
    pub(crate) route: RouteDescriptor,
}

/// Instantiated handlers keyed by name, plus message routes in discovery
/// order for destination/group lookups.
///
/// Built once at startup and never mutated.
pub struct InvocationTable {
    messages: HashMap<String, MessageEntry>,
    requests: HashMap<String, Arc<dyn ErasedRequestHandler>>,
    /// (handler, route) for message handlers, in discovery order.
    routes: Vec<(String, RouteDescriptor)>,
    descriptors: Vec<HandlerDescriptor>,
}

impl InvocationTable {
    /// Instantiate every discovered handler once.
    pub fn build(discovery: &Discovery) -> Self {
        let mut table = Self {
            messages: HashMap::new(),
            requests: HashMap::new(),
            routes: Vec::new(),
            descriptors: discovery.descriptors.clone(),
        };

        for descriptor in &discovery.descriptors {
            let name = descriptor.type_id.clone();
            match &descriptor.factory {
                HandlerFactory::Message(factory) => {
                    table.routes.push((name.clone(), descriptor.route.clone()));
                    table.messages.insert(
                        name.clone(),
                        MessageEntry {
                            handler: factory(),
                            route: descriptor.route.clone(),
                        },
                    );
                }
                HandlerFactory::Request(factory) => {
                    table.requests.insert(name.clone(), factory());
                }
            }
            debug!(handler = %name, kind = %descriptor.kind, route = ?descriptor.route, "handler registered");
        }

        info!(
            messages = table.messages.len(),
            requests = table.requests.len(),
            "invocation table built"
        );
        table
    }

    /// Run discovery over `modules` and build the table from the result.
    ///
    /// Module scan failures are returned alongside the table; they do not
    /// prevent the other modules from registering.
    pub fn from_modules(
        modules: &[&dyn TypeSource],
        settings: &Settings,
    ) -> (Self, Vec<DispatchError>) {
        let discovery = discover(modules, settings);
        let table = Self::build(&discovery);
        (table, discovery.failures)
    }

    pub(crate) fn message(&self, name: &str) -> Option<&MessageEntry> {
        self.messages.get(name)
    }

    pub(crate) fn request(&self, name: &str) -> Option<&Arc<dyn ErasedRequestHandler>> {
        self.requests.get(name)
    }

    /// Name of the first message handler whose route serves
    /// `destination` / `group`.
    pub fn handler_for(&self, destination: &str, group: Option<&str>) -> Option<&str> {
        self.routes
            .iter()
            .find(|(_, route)| route.matches(destination, group))
            .map(|(name, _)| name.as_str())
    }

    /// Route of a registered message handler.
    pub fn route(&self, name: &str) -> Option<&RouteDescriptor> {
        self.messages.get(name).map(|entry| &entry.route)
    }

    /// Whether a handler of the given kind is registered under `name`.
    pub fn contains(&self, name: &str, kind: HandlerKind) -> bool {
        match kind {
            HandlerKind::Message => self.messages.contains_key(name),
            HandlerKind::Request => self.requests.contains_key(name),
        }
    }

    /// Registered handlers, in discovery order.
    pub fn descriptors(&self) -> &[HandlerDescriptor] {
        &self.descriptors
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Publish every message route as binding variables in the process
    /// environment. Call once at startup.
    pub fn export_binding_variables(&self) {
        for (name, route) in &self.routes {
            route::export_binding_variables(name, route);
        }
    }
}

impl std::fmt::Debug for InvocationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationTable")
            .field("descriptors", &self.descriptors)
            .finish()
    }
}
