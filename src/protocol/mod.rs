//! MCP Protocol types

mod messages;
mod types;

pub use messages::*;
pub use types::*;

/// Latest MCP protocol version this server speaks
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol versions accepted during `initialize`, newest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Pick the protocol version to answer `initialize` with.
///
/// Echoes the client's version when supported, otherwise offers the latest.
#[must_use]
pub fn negotiate_version(client_version: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|v| **v == client_version)
        .copied()
        .unwrap_or(PROTOCOL_VERSION)
}
