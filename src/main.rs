//! Portainer MCP - Model Context Protocol server for Portainer

use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing::{error, info};

use portainer_mcp::{
    cli::{Cli, Command, ToolsFormat},
    config::{Config, TransportKind},
    protocol::ToolsListResult,
    schema::ToolSchema,
    server::{McpServer, serve_http, serve_stdio},
    setup_tracing,
    tools::{OperationCatalog, ToolRegistry, handlers},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    if let Some(Command::Completions { shell }) = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "portainer-mcp", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            cli.apply(&mut config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::Tools { format }) => run_tools(&config, format).await,
        Some(Command::Serve | Command::Completions { .. }) | None => run_server(&config).await,
    }
}

/// Print the tool surface the server would advertise
async fn run_tools(config: &Config, format: ToolsFormat) -> ExitCode {
    let result = async {
        let schema = ToolSchema::load(config.tools.path.as_deref()).await?;
        let catalog = OperationCatalog::from_schema(&schema, &handlers::operations())?;
        Ok::<_, portainer_mcp::Error>(ToolRegistry::new(catalog, config.tools.mode, config.tools.read_only))
    }
    .await;

    let registry = match result {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to build tool surface: {e}");
            return ExitCode::FAILURE;
        }
    };

    match format {
        ToolsFormat::Json => {
            let list = ToolsListResult {
                tools: registry.tools().to_vec(),
                next_cursor: None,
            };
            match serde_json::to_string_pretty(&list) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Failed to serialize tools: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        ToolsFormat::Text => {
            for tool in registry.tools() {
                let summary = tool
                    .description
                    .as_deref()
                    .and_then(|d| d.lines().next())
                    .unwrap_or_default();
                println!("{:<36} {summary}", tool.name);
            }
            println!(
                "\n{} tools ({:?} mode{})",
                registry.tools().len(),
                registry.mode(),
                if registry.read_only() { ", read-only" } else { "" }
            );
        }
    }
    ExitCode::SUCCESS
}

/// Run the MCP server
async fn run_server(config: &Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?config.server.transport,
        read_only = config.tools.read_only,
        mode = ?config.tools.mode,
        "Starting Portainer MCP server"
    );

    let server = match McpServer::from_config(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match config.server.transport {
        TransportKind::Stdio => serve_stdio(server).await,
        TransportKind::Http => serve_http(server, &config.server).await,
    };

    if let Err(e) = result {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}
