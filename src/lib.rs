//! Portainer MCP server library
//!
//! Exposes a Portainer server to AI agents over the Model Context Protocol.
//!
//! # Features
//!
//! - **Meta-tools**: related operations grouped behind one tool selected by
//!   an `action` argument (or one tool per operation with granular mode)
//! - **Read-only mode**: write operations are never advertised nor reachable
//! - **Version gate**: refuses to start against an unsupported Portainer
//! - **Transports**: newline-delimited JSON-RPC on stdio, or `POST /mcp`
//!
//! Tool descriptions and input schemas come from `tools.yaml`, which is
//! compiled in and may be overridden on disk.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod portainer;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod tools;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// Logs always go to stderr: stdout carries protocol traffic in stdio mode.
/// `RUST_LOG` takes precedence over `level`.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        Some("text") | None => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        Some(other) => {
            return Err(Error::Config(format!(
                "unknown log format '{other}' (expected text or json)"
            )));
        }
    };

    installed.map_err(|e| Error::Internal(format!("failed to install tracing subscriber: {e}")))
}
