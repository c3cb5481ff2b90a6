//! # Fezz Dispatch - Message and Request Dispatch Core
//!
//! Fezz Dispatch is the dispatch core behind a cloud-functions convenience
//! layer. Business code writes small typed handlers; the host hands this
//! crate raw trigger events and gets back a uniform outcome.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Host (message trigger / HTTP trigger)                  │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                   │ InboundEnvelope / FezzRequest
//!                                   ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            Dispatcher                               │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                    Invocation Table                          │   │
//! │  │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐    │   │
//! │  │  │ Message  │  │ Message  │  │ Request  │  │   ...    │    │   │
//! │  │  │ handler  │  │ handler  │  │ handler  │  │          │    │   │
//! │  │  └──────────┘  └──────────┘  └──────────┘  └──────────┘    │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! │        decode (codec) ─► invoke ─► outcome / error response         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fezz_dispatch::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct OrderCreated {
//!     order_id: String,
//! }
//!
//! #[message_function(name = "order-created", destination = "orders", group = "processing")]
//! async fn order_created(order: OrderCreated, _ctx: &InvocationContext) -> Result<(), FezzError> {
//!     tracing::info!(order_id = %order.order_id, "order received");
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DispatchError> {
//!     let settings = Settings::from_env(Some("FEZZ_"))?;
//!     let config = HostConfig::from_settings(&settings)?;
//!     config.validate(&settings)?;
//!
//!     let module = StaticModule::new("orders").with(OrderCreatedHandler::type_info());
//!     let (table, _failures) = InvocationTable::from_modules(&[&module], &settings);
//!     let dispatcher = Dispatcher::new(table).with_config(&config);
//!
//!     let envelope = InboundEnvelope::message(r#"{"orderId":"42"}"#);
//!     dispatcher
//!         .dispatch_message("order-created", envelope, CancellationToken::new())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! Message handlers re-signal failures to the host so its redelivery and
//! dead-letter rules apply. Request handlers never fail outward: errors are
//! logged and answered with a 500 whose body carries a fixed marker, the
//! cause and a UTC timestamp.
//!
//! ## Payloads
//!
//! Payloads are decoded case-insensitively (`orderId`, `OrderId` and
//! `ORDERID` all fill `order_id` under camelCase naming). An absent, blank
//! or `null` payload decodes to [`codec::Decoded::Empty`] and never reaches a
//! message handler.

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod http;
pub mod registry;
pub mod route;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::codec::{Decoded, JsonCodec, PayloadCodec};
    pub use crate::config::{HostConfig, Settings};
    pub use crate::dispatch::Dispatcher;
    pub use crate::error::{DispatchError, FezzError};
    pub use crate::handler::{
        DispatchOutcome, InboundEnvelope, InvocationContext, MessageHandler, RequestHandler,
        Stage,
    };
    pub use crate::http::{ActionResult, FezzRequest, FezzResponse, Method, StatusCode};
    pub use crate::registry::{InvocationTable, StaticModule, TypeInfo, TypeSource};
    pub use crate::route::{RouteDescriptor, RouteMetadata};
    pub use async_trait::async_trait;
    pub use fezz_dispatch_macro::{message_function, request_function};
    pub use tokio_util::sync::CancellationToken;
}

// Re-export for convenience
pub use dispatch::Dispatcher;
pub use error::{DispatchError, FezzError};
pub use handler::{InvocationContext, MessageHandler, RequestHandler};
pub use http::{FezzRequest, FezzResponse};
pub use registry::{InvocationTable, StaticModule};
