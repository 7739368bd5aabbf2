//! Configuration management

use std::{env, path::Path, path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::tools::ToolMode;
use crate::{Error, Result};

/// Prefix of environment variables overriding config file values
pub const ENV_PREFIX: &str = "PORTAINER_MCP_";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Portainer connection
    pub portainer: PortainerConfig,
    /// Tool surface
    pub tools: ToolsConfig,
    /// Transport
    pub server: ServerConfig,
}

/// Portainer connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortainerConfig {
    /// Base URL of the Portainer server, e.g. `https://portainer.local:9443`
    pub server_url: String,
    /// API access token. Supports a literal value or `env:VAR_NAME`
    #[serde(skip_serializing)]
    pub token: String,
    /// Accept self-signed certificates
    pub skip_tls_verify: bool,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Skip the startup version compatibility check
    pub disable_version_check: bool,
}

impl Default for PortainerConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            token: String::new(),
            skip_tls_verify: false,
            timeout: Duration::from_secs(30),
            disable_version_check: false,
        }
    }
}

impl PortainerConfig {
    /// Resolve the token (follow `env:VAR_NAME` indirection)
    #[must_use]
    pub fn resolve_token(&self) -> String {
        if let Some(var_name) = self.token.strip_prefix("env:") {
            env::var(var_name).unwrap_or_default()
        } else {
            self.token.clone()
        }
    }
}

/// Tool surface settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Tool definition file; the embedded copy is used when unset
    pub path: Option<PathBuf>,
    /// Only expose operations that cannot modify the backend
    pub read_only: bool,
    /// Advertise grouped meta-tools or one tool per operation
    pub mode: ToolMode,
}

/// Transport selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout
    #[default]
    Stdio,
    /// JSON-RPC over `POST /mcp`
    Http,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Transport to serve on
    pub transport: TransportKind,
    /// Host to bind to (http transport)
    pub host: String,
    /// Port to listen on (http transport)
    pub port: u16,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stdio,
            host: "127.0.0.1".to_string(),
            port: 39500,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Env files must be loaded before ${VAR} expansion
        config.load_env_files();
        config.expand_env_vars()?;

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = expand_home(path_str);
            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                    Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand ${VAR} and ${VAR:-default} patterns in config values
    fn expand_env_vars(&mut self) -> Result<()> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
            .map_err(|e| Error::Internal(format!("invalid expansion pattern: {e}")))?;

        self.portainer.server_url = expand_string(&re, &self.portainer.server_url);
        self.portainer.token = expand_string(&re, &self.portainer.token);
        if let Some(path) = &self.tools.path {
            let expanded = expand_home(&expand_string(&re, &path.to_string_lossy()));
            self.tools.path = Some(PathBuf::from(expanded));
        }
        Ok(())
    }

    /// Check the settings a server needs before it can start
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the server URL is missing or not an
    /// http(s) URL, or when no token is configured.
    pub fn validate(&self) -> Result<()> {
        if self.portainer.server_url.is_empty() {
            return Err(Error::Config(
                "Portainer server URL is required (--server or portainer.server_url)".to_string(),
            ));
        }
        let url = Url::parse(&self.portainer.server_url).map_err(|e| {
            Error::Config(format!(
                "Invalid Portainer server URL '{}': {e}",
                self.portainer.server_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Portainer server URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.portainer.resolve_token().is_empty() {
            return Err(Error::Config(
                "Portainer API token is required (--token or portainer.token)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string
fn expand_string(re: &Regex, value: &str) -> String {
    re.replace_all(value, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map_or("", |m| m.as_str());
        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .into_owned()
}

/// Replace a leading `~` with the home directory
fn expand_home(path: &str) -> String {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}{rest}", home.display()),
        _ => path.to_string(),
    }
}

/// Human-readable `Duration` (de)serialization: `30s`, `5m`, `100ms`
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Parse `100ms`, `30s`, `5m`; a bare number is seconds
    pub fn parse(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let number = |n: &str| n.parse::<u64>().map_err(|e| format!("invalid duration '{s}': {e}"));
        // "ms" must be tried before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            number(ms).map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            number(secs).map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            number(mins)?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("invalid duration '{s}': too large"))
        } else {
            number(s).map(Duration::from_secs)
        }
    }
}
