//! Type-erased handler slots.
//!
//! A slot pins a concrete handler to the codec chosen at registration so the
//! invocation table can hold handlers of any payload type side by side.

use crate::codec::PayloadCodec;
use crate::error::DispatchError;
use crate::handler::{
    run_message, run_request, DispatchOutcome, InboundEnvelope, InvocationContext,
    MessageHandler, RequestHandler,
};
use crate::http::FezzRequest;
use async_trait::async_trait;
use std::marker::PhantomData;

/// A message handler with its payload type erased.
#[async_trait]
pub(crate) trait ErasedMessageHandler: Send + Sync {
    async fn run(
        &self,
        envelope: InboundEnvelope,
        ctx: &InvocationContext,
    ) -> Result<DispatchOutcome, DispatchError>;
}

/// A request handler with its codec erased.
#[async_trait]
pub(crate) trait ErasedRequestHandler: Send + Sync {
    async fn run(&self, request: FezzRequest, ctx: &InvocationContext) -> DispatchOutcome;
}

pub(crate) struct MessageSlot<H, C> {
    handler: H,
    _codec: PhantomData<fn() -> C>,
}

impl<H, C> MessageSlot<H, C> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _codec: PhantomData,
        }
    }
}

#[async_trait]
impl<H, C> ErasedMessageHandler for MessageSlot<H, C>
where
    H: MessageHandler,
    C: PayloadCodec,
{
    async fn run(
        &self,
        envelope: InboundEnvelope,
        ctx: &InvocationContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        run_message::<H, C>(&self.handler, envelope, ctx).await
    }
}

pub(crate) struct RequestSlot<H, C> {
    handler: H,
    _codec: PhantomData<fn() -> C>,
}

impl<H, C> RequestSlot<H, C> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _codec: PhantomData,
        }
    }
}

#[async_trait]
impl<H, C> ErasedRequestHandler for RequestSlot<H, C>
where
    H: RequestHandler,
    C: PayloadCodec,
{
    async fn run(&self, request: FezzRequest, ctx: &InvocationContext) -> DispatchOutcome {
        run_request::<H, C>(&self.handler, request, ctx).await
    }
}
