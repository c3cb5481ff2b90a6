//! Modules that publish candidate types.

use super::TypeInfo;
use crate::handler::{MessageHandler, RequestHandler};
use thiserror::Error;

/// A module could not list its types.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ScanError {
    /// What went wrong.
    pub message: String,
}

impl ScanError {
    /// Create a scan error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A loaded compilation unit that can list the types it contains.
pub trait TypeSource: Send + Sync {
    /// Module name, for diagnostics.
    fn name(&self) -> &str;

    /// List the module's types in declaration order.
    fn scan(&self) -> Result<Vec<TypeInfo>, ScanError>;
}

/// An explicit, compile-time list of types.
///
/// ```
/// use fezz_dispatch::registry::{StaticModule, TypeSource};
///
/// let module = StaticModule::new("billing").plain("billing::Invoice");
/// assert_eq!(module.scan().unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticModule {
    name: String,
    types: Vec<TypeInfo>,
}

impl StaticModule {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    /// Add a prepared [`TypeInfo`], such as one generated by the
    /// `message_function` / `request_function` attributes.
    pub fn with(mut self, info: TypeInfo) -> Self {
        self.types.push(info);
        self
    }

    /// Add a message handler type.
    pub fn message<H>(self, name: impl Into<String>) -> Self
    where
        H: MessageHandler + Default,
    {
        self.with(TypeInfo::message::<H>(name))
    }

    /// Add a request handler type.
    pub fn request<H>(self, name: impl Into<String>) -> Self
    where
        H: RequestHandler + Default,
    {
        self.with(TypeInfo::request::<H>(name))
    }

    /// Add a type with no handler capability.
    pub fn plain(self, type_name: &'static str) -> Self {
        self.with(TypeInfo::plain(type_name))
    }

    /// Add an abstract type; it is listed but never registered.
    pub fn abstract_type(self, info: TypeInfo) -> Self {
        self.with(info.into_abstract())
    }
}

impl TypeSource for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self) -> Result<Vec<TypeInfo>, ScanError> {
        Ok(self.types.clone())
    }
}
