//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::config::{Config, TransportKind};
use crate::tools::ToolMode;

/// MCP server for Portainer environments, stacks and access control
#[derive(Parser, Debug)]
#[command(name = "portainer-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "PORTAINER_MCP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Portainer server URL
    #[arg(long, env = "PORTAINER_SERVER")]
    pub server: Option<String>,

    /// Portainer API token
    #[arg(long, env = "PORTAINER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Tool definition file (written with the defaults when missing)
    #[arg(long, global = true)]
    pub tools: Option<PathBuf>,

    /// Only expose operations that cannot modify Portainer
    #[arg(long, global = true)]
    pub read_only: bool,

    /// Advertise one tool per operation instead of grouped meta-tools
    #[arg(long, global = true)]
    pub granular_tools: bool,

    /// Skip the Portainer version compatibility check
    #[arg(long)]
    pub disable_version_check: bool,

    /// Accept self-signed Portainer certificates
    #[arg(long)]
    pub skip_tls_verify: bool,

    /// Transport to serve on
    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Port to listen on (http transport)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (http transport)
    #[arg(long)]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "PORTAINER_MCP_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "PORTAINER_MCP_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the MCP server (default)
    Serve,

    /// Print the advertised tool surface without contacting Portainer
    Tools {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ToolsFormat::Text)]
        format: ToolsFormat,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Output format of the `tools` subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToolsFormat {
    /// One line per tool
    Text,
    /// `tools/list` result as JSON
    Json,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.portainer.server_url.clone_from(server);
        }
        if let Some(token) = &self.token {
            config.portainer.token.clone_from(token);
        }
        if let Some(path) = &self.tools {
            config.tools.path = Some(path.clone());
        }
        if self.read_only {
            config.tools.read_only = true;
        }
        if self.granular_tools {
            config.tools.mode = ToolMode::Granular;
        }
        if self.disable_version_check {
            config.portainer.disable_version_check = true;
        }
        if self.skip_tls_verify {
            config.portainer.skip_tls_verify = true;
        }
        if let Some(transport) = self.transport {
            config.server.transport = transport;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
    }
}
