//! HTTP shapes exchanged with the hosting runtime.

mod action;
pub mod adapter;
mod request;
mod response;

pub use action::ActionResult;
pub use request::{FezzRequest, Method};
pub use response::{FezzResponse, StatusCode};
