//! Handler traits and the dispatch contract that wraps them.

pub mod context;
pub mod contract;
pub mod envelope;
pub mod message;
pub mod request;

pub use context::InvocationContext;
pub use contract::{run_message, run_request, DispatchOutcome, Stage, INTERNAL_ERROR_MARKER};
pub use envelope::{HandlerKind, InboundEnvelope};
pub use message::MessageHandler;
pub use request::RequestHandler;
