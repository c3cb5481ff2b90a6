//! Request-triggered handlers.

use super::InvocationContext;
use crate::error::FezzError;
use crate::http::{ActionResult, FezzRequest};
use async_trait::async_trait;

/// A business handler for HTTP requests.
///
/// Whatever happens inside, the caller gets a response: errors returned
/// here are rendered as a 500 with a fixed-shape body.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle an incoming request.
    async fn handle(
        &self,
        request: FezzRequest,
        ctx: &InvocationContext,
    ) -> Result<ActionResult, FezzError>;
}
