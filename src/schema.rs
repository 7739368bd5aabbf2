//! Tool definition file (`tools.yaml`)
//!
//! The file supplies the description, input schema and annotations of every
//! operation by name. A copy is compiled into the binary; a configured path
//! overrides it, and is seeded with the embedded copy when it does not exist.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::protocol::Tool;
use crate::{Error, Result};

/// Embedded default definitions
pub const DEFAULT_TOOLS_YAML: &str = include_str!("../tools.yaml");

/// Oldest tools file version this build understands
pub const MINIMUM_TOOLS_VERSION: &str = "v1.0";

#[derive(Debug, Deserialize)]
struct ToolsFile {
    version: String,
    #[serde(default)]
    tools: Vec<Tool>,
}

/// Tool definitions keyed by operation name
#[derive(Debug, Clone, Default)]
pub struct ToolSchema {
    version: String,
    tools: HashMap<String, Tool>,
}

impl ToolSchema {
    /// Parse definitions from YAML text
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaLoad`] on malformed YAML, duplicate tool names,
    /// or a version below [`MINIMUM_TOOLS_VERSION`].
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: ToolsFile = serde_yaml::from_str(content)
            .map_err(|e| Error::SchemaLoad(format!("invalid tools file: {e}")))?;

        if !version_at_least(&file.version, MINIMUM_TOOLS_VERSION)? {
            return Err(Error::SchemaLoad(format!(
                "tools file version {} is older than the minimum supported {MINIMUM_TOOLS_VERSION}",
                file.version
            )));
        }

        let mut tools = HashMap::with_capacity(file.tools.len());
        for tool in file.tools {
            let name = tool.name.clone();
            if tools.insert(name.clone(), tool).is_some() {
                return Err(Error::SchemaLoad(format!("duplicate tool definition '{name}'")));
            }
        }

        Ok(Self {
            version: file.version,
            tools,
        })
    }

    /// Definitions compiled into the binary
    ///
    /// # Errors
    ///
    /// Only fails if the embedded file is broken, which tests guard against.
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(DEFAULT_TOOLS_YAML)
    }

    /// Load from `path`, or the embedded copy when no path is configured
    ///
    /// A configured path that does not exist is created with the embedded
    /// definitions so operators have a starting point to edit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaLoad`] when the file cannot be read, written
    /// or parsed.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("Using embedded tool definitions");
            return Self::embedded();
        };

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::SchemaLoad(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
            tokio::fs::write(path, DEFAULT_TOOLS_YAML).await.map_err(|e| {
                Error::SchemaLoad(format!("failed to write {}: {e}", path.display()))
            })?;
            info!(path = %path.display(), "Wrote default tool definitions");
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::SchemaLoad(format!("failed to read {}: {e}", path.display())))?;
        let schema = Self::from_yaml(&content)?;
        info!(
            path = %path.display(),
            version = %schema.version,
            tools = schema.len(),
            "Loaded tool definitions"
        );
        Ok(schema)
    }

    /// Definition for an operation
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// File version
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when the file defines no tools
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Compare `vMAJOR.MINOR` versions
fn version_at_least(version: &str, minimum: &str) -> Result<bool> {
    Ok(parse_version(version)? >= parse_version(minimum)?)
}

fn parse_version(version: &str) -> Result<(u32, u32)> {
    let invalid = || Error::SchemaLoad(format!("invalid tools file version '{version}'"));
    let digits = version.strip_prefix('v').unwrap_or(version);
    let (major, minor) = digits.split_once('.').unwrap_or((digits, "0"));
    let major = major.parse().map_err(|_| invalid())?;
    let minor = minor.parse().map_err(|_| invalid())?;
    Ok((major, minor))
}
