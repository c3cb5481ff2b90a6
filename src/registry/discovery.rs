//! Qualifying handler types across modules.

use super::{Capability, HandlerFactory, TypeInfo, TypeSource};
use crate::config::Settings;
use crate::error::{panic_message, DispatchError};
use crate::handler::HandlerKind;
use crate::route::{self, RouteDescriptor};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// A qualified handler type with its resolved route.
#[derive(Clone)]
pub struct HandlerDescriptor {
    /// Handler identity.
    pub type_id: String,
    /// Rust type name, for diagnostics.
    pub type_name: &'static str,
    /// Payload type tag for message handlers.
    pub payload_type: Option<&'static str>,
    /// Resolved route; the default route for request handlers.
    pub route: RouteDescriptor,
    /// Trigger kind.
    pub kind: HandlerKind,
    pub(crate) factory: HandlerFactory,
}

impl std::fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .field("payload_type", &self.payload_type)
            .field("route", &self.route)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Qualified handlers, in module order then declaration order.
    pub descriptors: Vec<HandlerDescriptor>,
    /// Modules that failed to scan. Each was skipped.
    pub failures: Vec<DispatchError>,
}

impl Discovery {
    /// Number of qualified handlers.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no handler qualified.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptor for `type_id`, if discovered.
    pub fn get(&self, type_id: &str) -> Option<&HandlerDescriptor> {
        self.descriptors.iter().find(|d| d.type_id == type_id)
    }
}

/// Scan `modules` and qualify every concrete type carrying a handler
/// capability.
///
/// A module whose scan fails (or panics) is logged, recorded in
/// [`Discovery::failures`] and skipped; the others are unaffected. When two
/// modules publish the same handler identity, the first one wins.
pub fn discover(modules: &[&dyn TypeSource], settings: &Settings) -> Discovery {
    let mut discovery = Discovery::default();
    let mut seen = HashSet::new();

    for module in modules {
        let types = match scan_isolated(*module) {
            Ok(types) => types,
            Err(err) => {
                error!(module = %module.name(), error = %err, "module scan failed, skipping");
                discovery.failures.push(err);
                continue;
            }
        };

        let total = types.len();
        let mut qualified = 0;
        for info in types {
            let Some(descriptor) = qualify(info, settings) else {
                continue;
            };
            if !seen.insert(descriptor.type_id.clone()) {
                warn!(
                    module = %module.name(),
                    handler = %descriptor.type_id,
                    "duplicate handler identity ignored"
                );
                continue;
            }
            qualified += 1;
            discovery.descriptors.push(descriptor);
        }
        debug!(module = %module.name(), total, qualified, "module scanned");
    }

    info!(
        handlers = discovery.descriptors.len(),
        failed_modules = discovery.failures.len(),
        "discovery complete"
    );
    discovery
}

fn scan_isolated(module: &dyn TypeSource) -> Result<Vec<TypeInfo>, DispatchError> {
    let scanned = panic::catch_unwind(AssertUnwindSafe(|| module.scan()));
    let reason = match scanned {
        Ok(Ok(types)) => return Ok(types),
        Ok(Err(err)) => err.message,
        Err(payload) => panic_message(payload.as_ref()),
    };
    Err(DispatchError::DiscoveryScanFailed {
        module: module.name().to_string(),
        reason,
    })
}

fn qualify(info: TypeInfo, settings: &Settings) -> Option<HandlerDescriptor> {
    if info.is_abstract {
        return None;
    }
    let capability = info.capability?;
    let factory = info.factory?;

    let (payload_type, route) = match capability {
        Capability::Message { payload_type } => (
            Some(payload_type),
            route::resolve(&info.type_id, &info.route, settings),
        ),
        Capability::Request => (None, RouteDescriptor::default()),
    };

    Some(HandlerDescriptor {
        type_id: info.type_id,
        type_name: info.type_name,
        payload_type,
        route,
        kind: capability.kind(),
        factory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FezzError;
    use crate::handler::{InvocationContext, MessageHandler, RequestHandler};
    use crate::http::{ActionResult, FezzRequest};
    use crate::registry::{ScanError, StaticModule};
    use crate::route::RouteMetadata;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Order {
        #[allow(dead_code)]
        id: String,
    }

    #[derive(Default)]
    struct OrderHandler;

    #[async_trait]
    impl MessageHandler for OrderHandler {
        type Payload = Order;

        async fn handle(&self, _payload: Order, _ctx: &InvocationContext) -> Result<(), FezzError> {
            Ok(())
        }

        fn route() -> RouteMetadata {
            RouteMetadata::new().destination("orders").group("processing")
        }
    }

    #[derive(Default)]
    struct Health;

    #[async_trait]
    impl RequestHandler for Health {
        async fn handle(&self, _request: FezzRequest, _ctx: &InvocationContext) -> Result<ActionResult, FezzError> {
            Ok(ActionResult::OkEmpty)
        }
    }

    struct Broken;

    impl TypeSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn scan(&self) -> Result<Vec<TypeInfo>, ScanError> {
            Err(ScanError::new("could not load types"))
        }
    }

    struct Panicking;

    impl TypeSource for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn scan(&self) -> Result<Vec<TypeInfo>, ScanError> {
            panic!("malformed module")
        }
    }

    fn orders_module() -> StaticModule {
        StaticModule::new("orders")
            .message::<OrderHandler>("order-created")
            .request::<Health>("health")
            .plain("orders::Order")
            .abstract_type(TypeInfo::message::<OrderHandler>("order-base"))
    }

    #[test]
    fn test_only_concrete_handlers_qualify() {
        let discovery = discover(&[&orders_module()], &Settings::new());

        let ids: Vec<&str> = discovery.descriptors.iter().map(|d| d.type_id.as_str()).collect();
        assert_eq!(ids, vec!["order-created", "health"]);
        assert!(discovery.failures.is_empty());

        let order = discovery.get("order-created").unwrap();
        assert_eq!(order.kind, HandlerKind::Message);
        assert!(order.payload_type.unwrap().ends_with("Order"));
        assert_eq!(order.route.destination.as_deref(), Some("orders"));
        assert_eq!(discovery.get("health").unwrap().payload_type, None);
    }

    #[test]
    fn test_failing_modules_are_isolated() {
        let discovery = discover(&[&Broken, &orders_module(), &Panicking], &Settings::new());

        assert_eq!(discovery.len(), 2);
        assert_eq!(discovery.failures.len(), 2);
        match &discovery.failures[0] {
            DispatchError::DiscoveryScanFailed { module, reason } => {
                assert_eq!(module, "broken");
                assert_eq!(reason, "could not load types");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            &discovery.failures[1],
            DispatchError::DiscoveryScanFailed { module, reason }
                if module == "panicking" && reason == "malformed module"
        ));
    }

    #[test]
    fn test_discovery_is_deterministic() {
        let settings = Settings::new().with("Messaging:Connection", "bus");
        let module = orders_module();
        let first = discover(&[&module], &settings);
        let second = discover(&[&module], &settings);

        let summarize = |d: &Discovery| {
            d.descriptors
                .iter()
                .map(|h| (h.type_id.clone(), h.route.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(summarize(&first), summarize(&second));
        assert_eq!(first.get("order-created").unwrap().route.connection, "bus");
    }

    #[test]
    fn test_duplicate_identity_keeps_first() {
        let other = StaticModule::new("other").request::<Health>("order-created");
        let discovery = discover(&[&orders_module(), &other], &Settings::new());

        assert_eq!(discovery.len(), 2);
        assert_eq!(discovery.get("order-created").unwrap().kind, HandlerKind::Message);
    }

    #[test]
    fn test_no_modules() {
        let discovery = discover(&[], &Settings::new());
        assert!(discovery.is_empty());
    }
}
