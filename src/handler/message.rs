//! Message-triggered handlers.

use super::InvocationContext;
use crate::error::FezzError;
use crate::route::RouteMetadata;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// A business handler for messages of one payload type.
///
/// Identity is given at registration (see
/// [`TypeInfo::message`](crate::registry::TypeInfo::message)), not by the
/// handler itself.
///
/// The dispatch contract decodes the raw message into [`Self::Payload`]
/// before calling [`MessageHandler::handle`]; an empty or malformed message
/// never reaches the handler. Returning an error hands the message back to
/// the broker for redelivery or dead-lettering.
///
/// ```
/// use fezz_dispatch::prelude::*;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct OrderCreated {
///     order_id: String,
/// }
///
/// struct OrderCreatedHandler;
///
/// #[async_trait]
/// impl MessageHandler for OrderCreatedHandler {
///     type Payload = OrderCreated;
///
///     async fn handle(&self, payload: OrderCreated, _ctx: &InvocationContext) -> Result<(), FezzError> {
///         tracing::info!(order_id = %payload.order_id, "order received");
///         Ok(())
///     }
///
///     fn route() -> RouteMetadata {
///         RouteMetadata::new().destination("orders").group("processing")
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Decoded payload type.
    type Payload: DeserializeOwned + Send + 'static;

    /// Handle one decoded message.
    async fn handle(&self, payload: Self::Payload, ctx: &InvocationContext)
        -> Result<(), FezzError>;

    /// Explicit route metadata for this handler type.
    ///
    /// Values set here win over configuration.
    fn route() -> RouteMetadata
    where
        Self: Sized,
    {
        RouteMetadata::default()
    }
}
