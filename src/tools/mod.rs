//! Tool surface: catalog, registry, dispatcher and operation handlers

pub mod catalog;
mod dispatch;
mod envelope;
pub mod handlers;
pub mod registry;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use futures::future::BoxFuture;
use tool_args::Arguments;

use crate::Result;
use crate::portainer::PortainerBackend;

pub use catalog::{Operation, OperationCatalog, OperationSpec, Permission};
pub use dispatch::Dispatcher;
pub use envelope::ResultEnvelope;
pub use registry::{META_TOOLS, MetaTool, ToolMode, ToolRegistry};

/// Operation implementation
///
/// A plain function pointer so the operation table can be a `const`.
pub type Handler =
    for<'a> fn(&'a ToolContext, &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>>;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ToolContext {
    backend: Arc<dyn PortainerBackend>,
}

impl ToolContext {
    /// Context over a backend
    pub fn new(backend: Arc<dyn PortainerBackend>) -> Self {
        Self { backend }
    }

    /// Backend collaborator
    #[must_use]
    pub fn backend(&self) -> &dyn PortainerBackend {
        self.backend.as_ref()
    }
}
