//! Handler discovery and the invocation table.
//!
//! There is no runtime reflection: each compilation unit publishes a
//! [`TypeSource`] (usually a [`StaticModule`]) listing the types it wants
//! considered. [`discover`] qualifies the concrete ones that carry a handler
//! capability and resolves their routes; [`InvocationTable::build`]
//! instantiates them once for dispatch.

mod discovery;
mod slot;
mod source;
mod table;

pub use discovery::{discover, Discovery, HandlerDescriptor};
pub use source::{ScanError, StaticModule, TypeSource};
pub use table::InvocationTable;

pub(crate) use slot::{ErasedMessageHandler, ErasedRequestHandler};

use crate::codec::{JsonCodec, PayloadCodec};
use crate::handler::{HandlerKind, MessageHandler, RequestHandler};
use crate::route::RouteMetadata;
use slot::{MessageSlot, RequestSlot};
use std::sync::Arc;

/// Handler capability carried by a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Implements [`MessageHandler`] for the named payload type.
    Message {
        /// Payload type tag.
        payload_type: &'static str,
    },
    /// Implements [`RequestHandler`].
    Request,
}

impl Capability {
    /// Trigger kind of this capability.
    pub fn kind(&self) -> HandlerKind {
        match self {
            Capability::Message { .. } => HandlerKind::Message,
            Capability::Request => HandlerKind::Request,
        }
    }
}

/// Builds a fresh handler instance behind its dispatch slot.
#[derive(Clone)]
pub(crate) enum HandlerFactory {
    Message(Arc<dyn Fn() -> Arc<dyn ErasedMessageHandler> + Send + Sync>),
    Request(Arc<dyn Fn() -> Arc<dyn ErasedRequestHandler> + Send + Sync>),
}

/// A candidate type published by a module.
#[derive(Clone)]
pub struct TypeInfo {
    /// Identity; the handler name for handler types.
    pub type_id: String,
    /// Rust type name, for diagnostics.
    pub type_name: &'static str,
    /// Abstract types are never instantiated.
    pub is_abstract: bool,
    /// Handler capability, if any.
    pub capability: Option<Capability>,
    /// Explicit route metadata declared on the type.
    pub route: RouteMetadata,
    pub(crate) factory: Option<HandlerFactory>,
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .field("is_abstract", &self.is_abstract)
            .field("capability", &self.capability)
            .field("route", &self.route)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

impl TypeInfo {
    /// A message handler decoded with [`JsonCodec`].
    pub fn message<H>(name: impl Into<String>) -> Self
    where
        H: MessageHandler + Default,
    {
        Self::message_with_codec::<H, JsonCodec>(name)
    }

    /// A message handler decoded with codec `C`.
    pub fn message_with_codec<H, C>(name: impl Into<String>) -> Self
    where
        H: MessageHandler + Default,
        C: PayloadCodec,
    {
        let factory: Arc<dyn Fn() -> Arc<dyn ErasedMessageHandler> + Send + Sync> =
            Arc::new(|| Arc::new(MessageSlot::<H, C>::new(H::default())));
        Self {
            type_id: name.into(),
            type_name: std::any::type_name::<H>(),
            is_abstract: false,
            capability: Some(Capability::Message {
                payload_type: std::any::type_name::<H::Payload>(),
            }),
            route: H::route(),
            factory: Some(HandlerFactory::Message(factory)),
        }
    }

    /// A request handler answering with [`JsonCodec`] bodies.
    pub fn request<H>(name: impl Into<String>) -> Self
    where
        H: RequestHandler + Default,
    {
        Self::request_with_codec::<H, JsonCodec>(name)
    }

    /// A request handler answering with codec `C` bodies.
    pub fn request_with_codec<H, C>(name: impl Into<String>) -> Self
    where
        H: RequestHandler + Default,
        C: PayloadCodec,
    {
        let factory: Arc<dyn Fn() -> Arc<dyn ErasedRequestHandler> + Send + Sync> =
            Arc::new(|| Arc::new(RequestSlot::<H, C>::new(H::default())));
        Self {
            type_id: name.into(),
            type_name: std::any::type_name::<H>(),
            is_abstract: false,
            capability: Some(Capability::Request),
            route: RouteMetadata::default(),
            factory: Some(HandlerFactory::Request(factory)),
        }
    }

    /// A type without handler capability.
    pub fn plain(type_name: &'static str) -> Self {
        Self {
            type_id: type_name.to_string(),
            type_name,
            is_abstract: false,
            capability: None,
            route: RouteMetadata::default(),
            factory: None,
        }
    }

    /// Mark the type abstract: it is listed but never qualifies.
    pub fn into_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Override the explicit route metadata.
    pub fn with_route(mut self, route: RouteMetadata) -> Self {
        self.route = route;
        self
    }

    /// Whether discovery should register this type.
    pub fn qualifies(&self) -> bool {
        !self.is_abstract && self.capability.is_some() && self.factory.is_some()
    }
}
