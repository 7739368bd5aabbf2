//! Tool call dispatch

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tool_args::{ArgError, Arguments};
use tracing::{debug, error, warn};

use super::catalog::Operation;
use super::envelope::ResultEnvelope;
use super::registry::{ACTION_ARGUMENT, Target, ToolRegistry};
use super::ToolContext;
use crate::{Error, Result};

/// Routes `tools/call` requests to operation handlers
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    context: Arc<ToolContext>,
}

impl Dispatcher {
    /// Create a dispatcher over an immutable registry
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, context: ToolContext) -> Self {
        Self {
            registry,
            context: Arc::new(context),
        }
    }

    /// Tool surface being served
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one tool call to completion
    ///
    /// Never fails: every problem is reported through the returned envelope.
    /// Cancelling `cancel` drops the in-flight handler (and its backend
    /// request) and yields a `request cancelled` error.
    pub async fn dispatch(
        &self,
        tool: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> ResultEnvelope {
        let started = Instant::now();
        let outcome = self.run(tool, arguments, cancel).await;
        let elapsed_ms = started.elapsed().as_millis();

        match outcome {
            Ok(envelope) => {
                debug!(tool, elapsed_ms, is_error = envelope.is_error(), "Tool call finished");
                envelope
            }
            Err(e) => {
                match &e {
                    Error::Argument(_) | Error::Cancelled => {
                        debug!(tool, elapsed_ms, error = %e, "Tool call rejected");
                    }
                    Error::Internal(_) => error!(tool, error = %e, "Tool call hit an internal error"),
                    _ => warn!(tool, elapsed_ms, error = %e, "Tool call failed"),
                }
                ResultEnvelope::from_error(&e)
            }
        }
    }

    async fn run(&self, tool: &str, arguments: Value, cancel: &CancellationToken) -> Result<ResultEnvelope> {
        let arguments = Arguments::from_value(arguments)?;
        let operation = self.resolve(tool, &arguments)?;

        if self.registry.read_only() && !operation.permission.is_read_only() {
            return Err(Error::Internal(format!(
                "write operation '{}' reached in read-only mode",
                operation.name
            )));
        }

        arguments.require_all(operation.definition.required_arguments())?;

        debug!(tool, operation = operation.name, "Dispatching tool call");
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = (operation.handler)(self.context.as_ref(), &arguments) => result,
        }
    }

    fn resolve(&self, tool: &str, arguments: &Arguments) -> Result<&Operation> {
        match self.registry.resolve(tool) {
            Some(Target::Operation(operation)) => Ok(operation),
            Some(Target::Meta(meta)) => {
                let action = arguments.string(ACTION_ARGUMENT, true)?;
                self.registry.action(meta, &action).ok_or_else(|| {
                    ArgError::invalid(
                        ACTION_ARGUMENT,
                        format!(
                            "unknown action '{action}' for {}; expected one of: {}",
                            meta.name,
                            meta.actions.join(", ")
                        ),
                    )
                    .into()
                })
            }
            None => Err(Error::Protocol(format!("unknown tool: {tool}"))),
        }
    }
}
