//! Error types for the Portainer MCP server

use std::io;

use thiserror::Error;
use tool_args::ArgError;
use tool_args::version::VersionMismatch;

/// Result type alias for the Portainer MCP server
pub type Result<T> = std::result::Result<T, Error>;

/// Portainer MCP errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tool definition file could not be loaded
    #[error("Failed to load tool definitions: {0}")]
    SchemaLoad(String),

    /// Backend version outside the supported range
    #[error(transparent)]
    IncompatibleVersion(#[from] VersionMismatch),

    /// Missing, malformed or invalid tool argument
    #[error(transparent)]
    Argument(#[from] ArgError),

    /// A backend call failed; `operation` names what was attempted
    #[error("{operation}: {source}")]
    Backend {
        /// Human-readable description, e.g. "failed to get environment"
        operation: String,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// Non-success HTTP status from the Portainer API
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Tool result could not be serialized
    #[error("failed to marshal result: {0}")]
    Serialization(String),

    /// The request was cancelled by the client
    #[error("request cancelled")]
    Cancelled,

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON-RPC error
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        /// Error code
        code: i32,
        /// Error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error (invariant violation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a JSON-RPC error
    pub fn json_rpc(code: i32, message: impl Into<String>) -> Self {
        Self::JsonRpc {
            code,
            message: message.into(),
        }
    }

    /// Wrap a backend failure with the operation that was attempted
    pub fn backend(operation: impl Into<String>, source: Error) -> Self {
        Self::Backend {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// True for errors only raised while the server is being constructed
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::SchemaLoad(_) | Self::IncompatibleVersion(_)
        )
    }

    /// Convert to JSON-RPC error code
    #[must_use]
    pub fn to_rpc_code(&self) -> i32 {
        match self {
            Self::JsonRpc { code, .. } => *code,
            Self::Json(_) => rpc_codes::PARSE_ERROR,
            Self::Protocol(_) => rpc_codes::INVALID_REQUEST,
            Self::Argument(_) => rpc_codes::INVALID_PARAMS,
            Self::Backend { .. } | Self::Api { .. } | Self::Http(_) | Self::Transport(_) => {
                rpc_codes::SERVER_ERROR_START
            }
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Standard JSON-RPC error codes
pub mod rpc_codes {
    /// Parse error - Invalid JSON
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - Not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Server error range start
    pub const SERVER_ERROR_START: i32 = -32000;
}
