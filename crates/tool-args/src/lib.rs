//! Tool argument primitives
//!
//! Typed extraction from the untyped JSON argument map an MCP client sends
//! with `tools/call`, plus the small set of domain validators shared by all
//! tool handlers and the version helpers used by the startup gate.
//!
//! Every error renders as `invalid <name> parameter: <reason>` so callers can
//! tell which argument was rejected without parsing structured data.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod args;
pub mod validate;
pub mod version;

pub use args::{Arguments, KeyValue};

use thiserror::Error;

/// Argument extraction or validation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    /// Required argument was not supplied
    #[error("invalid {name} parameter: {name} is required")]
    Missing {
        /// Argument name
        name: String,
    },

    /// Argument was supplied with the wrong JSON shape
    #[error("invalid {name} parameter: expected {expected}")]
    WrongType {
        /// Argument name
        name: String,
        /// Expected kind (e.g. "string", "array of integers")
        expected: &'static str,
    },

    /// Argument is well-typed but violates a domain rule
    #[error("invalid {name} parameter: {reason}")]
    Invalid {
        /// Argument name
        name: String,
        /// Violated rule
        reason: String,
    },
}

impl ArgError {
    /// Create a missing-argument error
    pub fn missing(name: impl Into<String>) -> Self {
        Self::Missing { name: name.into() }
    }

    /// Create a wrong-type error
    pub fn wrong_type(name: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            name: name.into(),
            expected,
        }
    }

    /// Create a validation error
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending argument
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Missing { name } | Self::WrongType { name, .. } | Self::Invalid { name, .. } => {
                name
            }
        }
    }

    /// True when the argument was present and well-typed but broke a domain rule
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

/// Result alias for argument handling
pub type Result<T> = std::result::Result<T, ArgError>;
