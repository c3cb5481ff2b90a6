//! Route descriptors for message handlers.
//!
//! A handler's destination, group and connection are resolved field by
//! field, first match wins:
//!
//! 1. explicit metadata on the handler type ([`RouteMetadata`]),
//! 2. the handler's own section, `Handlers:<name>:{Destination,Group,Connection}`,
//! 3. global fallbacks, `Messaging:{Destination,Group,Connection}`,
//! 4. [`DEFAULT_CONNECTION`] for the connection.
//!
//! The resolved [`RouteDescriptor`] is consumed directly by registration.
//! Trigger bindings that can only read the process environment get the
//! same values from [`binding_variables`], written by the single adapter
//! [`export_binding_variables`].

use crate::config::{Settings, KEY_DELIMITER};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Connection reference used when nothing else names one.
pub const DEFAULT_CONNECTION: &str = "default";
/// Section holding per-handler overrides.
pub const HANDLERS_SECTION: &str = "Handlers";
/// Section holding global fallbacks.
pub const MESSAGING_SECTION: &str = "Messaging";

const DESTINATION: &str = "Destination";
const GROUP: &str = "Group";
const CONNECTION: &str = "Connection";

/// Explicit route metadata attached to a handler type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMetadata {
    /// Destination (topic/queue) name.
    pub destination: Option<String>,
    /// Group (subscription) name.
    pub group: Option<String>,
    /// Connection reference.
    pub connection: Option<String>,
}

impl RouteMetadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the destination.
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Set the group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the connection reference.
    pub fn connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = Some(connection.into());
        self
    }
}

/// Resolved route of a message handler. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Destination (topic/queue) name.
    pub destination: Option<String>,
    /// Group (subscription) name.
    pub group: Option<String>,
    /// Connection reference; never empty.
    pub connection: String,
}

impl Default for RouteDescriptor {
    fn default() -> Self {
        Self {
            destination: None,
            group: None,
            connection: DEFAULT_CONNECTION.to_string(),
        }
    }
}

impl RouteDescriptor {
    /// Whether this route serves `destination` / `group`.
    ///
    /// A route without a group matches any group on its destination.
    pub fn matches(&self, destination: &str, group: Option<&str>) -> bool {
        if self.destination.as_deref() != Some(destination) {
            return false;
        }
        match (self.group.as_deref(), group) {
            (None, _) => true,
            (Some(mine), Some(theirs)) => mine == theirs,
            (Some(_), None) => false,
        }
    }
}

/// Resolve the route of `handler` from its explicit metadata and settings.
pub fn resolve(handler: &str, explicit: &RouteMetadata, settings: &Settings) -> RouteDescriptor {
    let field = |explicit: &Option<String>, name: &str| -> Option<String> {
        non_empty(explicit.as_deref())
            .or_else(|| settings.get_non_empty(&section_key(&[HANDLERS_SECTION, handler, name])))
            .or_else(|| settings.get_non_empty(&section_key(&[MESSAGING_SECTION, name])))
            .map(str::to_string)
    };

    let route = RouteDescriptor {
        destination: field(&explicit.destination, DESTINATION),
        group: field(&explicit.group, GROUP),
        connection: field(&explicit.connection, CONNECTION)
            .unwrap_or_else(|| DEFAULT_CONNECTION.to_string()),
    };
    debug!(handler = %handler, ?route, "route resolved");
    route
}

/// Environment-style pairs carrying a resolved route.
///
/// Keys are `FEZZ_<HANDLER>_{DESTINATION,GROUP,CONNECTION}` with the handler
/// name upper-cased and non-alphanumerics mapped to `_`. Absent values are
/// omitted.
pub fn binding_variables(handler: &str, route: &RouteDescriptor) -> Vec<(String, String)> {
    let stem = env_stem(handler);
    let mut vars = Vec::with_capacity(3);
    if let Some(destination) = &route.destination {
        vars.push((format!("{stem}_DESTINATION"), destination.clone()));
    }
    if let Some(group) = &route.group {
        vars.push((format!("{stem}_GROUP"), group.clone()));
    }
    vars.push((format!("{stem}_CONNECTION"), route.connection.clone()));
    vars
}

/// Write a handler's binding variables into the process environment.
///
/// Call once at startup, before invocations begin.
pub fn export_binding_variables(handler: &str, route: &RouteDescriptor) {
    for (key, value) in binding_variables(handler, route) {
        debug!(%key, %value, "exporting binding variable");
        std::env::set_var(key, value);
    }
}

fn env_stem(handler: &str) -> String {
    let name: String = handler
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("FEZZ_{name}")
}

fn section_key(parts: &[&str]) -> String {
    parts.join(KEY_DELIMITER)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::new()
            .with("Handlers:order-created:Destination", "orders-from-section")
            .with("Handlers:order-created:Group", "section-group")
            .with("Messaging:Destination", "global-destination")
            .with("Messaging:Group", "global-group")
    }

    #[test]
    fn test_explicit_metadata_wins() {
        let explicit = RouteMetadata::new()
            .destination("orders")
            .group("processing")
            .connection("bus");
        let route = resolve("order-created", &explicit, &settings());

        assert_eq!(route.destination.as_deref(), Some("orders"));
        assert_eq!(route.group.as_deref(), Some("processing"));
        assert_eq!(route.connection, "bus");
    }

    #[test]
    fn test_named_section_beats_global() {
        let route = resolve("order-created", &RouteMetadata::new(), &settings());
        assert_eq!(route.destination.as_deref(), Some("orders-from-section"));
        assert_eq!(route.group.as_deref(), Some("section-group"));
    }

    #[test]
    fn test_global_fallback_then_default_connection() {
        let route = resolve("invoice-paid", &RouteMetadata::new(), &settings());
        assert_eq!(route.destination.as_deref(), Some("global-destination"));
        assert_eq!(route.group.as_deref(), Some("global-group"));
        assert_eq!(route.connection, DEFAULT_CONNECTION);
    }

    #[test]
    fn test_blank_explicit_values_fall_through() {
        let explicit = RouteMetadata::new().destination("  ").connection("");
        let route = resolve("order-created", &explicit, &Settings::new());
        assert_eq!(route.destination, None);
        assert_eq!(route.group, None);
        assert_eq!(route.connection, DEFAULT_CONNECTION);
    }

    #[test]
    fn test_fields_resolve_independently() {
        let explicit = RouteMetadata::new().group("explicit-group");
        let route = resolve("order-created", &explicit, &settings());
        assert_eq!(route.destination.as_deref(), Some("orders-from-section"));
        assert_eq!(route.group.as_deref(), Some("explicit-group"));
    }

    #[test]
    fn test_binding_variables() {
        let route = RouteDescriptor {
            destination: Some("orders".to_string()),
            group: None,
            connection: "bus".to_string(),
        };
        let vars = binding_variables("order-created", &route);
        assert_eq!(
            vars,
            vec![
                ("FEZZ_ORDER_CREATED_DESTINATION".to_string(), "orders".to_string()),
                ("FEZZ_ORDER_CREATED_CONNECTION".to_string(), "bus".to_string()),
            ]
        );
    }

    #[test]
    fn test_export_binding_variables_writes_env() {
        let route = RouteDescriptor {
            destination: Some("audit".to_string()),
            group: Some("archive".to_string()),
            connection: DEFAULT_CONNECTION.to_string(),
        };
        export_binding_variables("route-export-test", &route);
        assert_eq!(
            std::env::var("FEZZ_ROUTE_EXPORT_TEST_GROUP").as_deref(),
            Ok("archive")
        );
    }

    #[test]
    fn test_route_matching() {
        let route = RouteDescriptor {
            destination: Some("orders".to_string()),
            group: Some("processing".to_string()),
            connection: DEFAULT_CONNECTION.to_string(),
        };
        assert!(route.matches("orders", Some("processing")));
        assert!(!route.matches("orders", Some("audit")));
        assert!(!route.matches("orders", None));
        assert!(!route.matches("invoices", Some("processing")));

        let any_group = RouteDescriptor {
            group: None,
            ..route
        };
        assert!(any_group.matches("orders", Some("audit")));
    }
}
