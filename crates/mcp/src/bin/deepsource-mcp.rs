// DeepSource MCP server binary

use anyhow::{Context, Result};
use clap::Parser;
use deepsource_mcp::config::{CliOverrides, LoggingConfig, ServerConfig};
use deepsource_mcp::server::McpServer;
use deepsource_mcp::tools::{register_all, ToolRegistry};
use deepsource_sdk::DeepSourceClient;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deepsource-mcp", version)]
#[command(about = "Model Context Protocol server for the DeepSource API", long_about = None)]
struct Args {
    /// Path to configuration file (default: deepsource-mcp.toml, if present)
    #[arg(short, long, env = "DEEPSOURCE_MCP_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: CliOverrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServerConfig::load(args.config.as_deref(), &args.overrides)?;

    init_tracing(&config.logging)?;
    tracing::info!("DeepSource MCP server starting...");

    let cancel = CancellationToken::new();
    let client_config = config.client_config()?;
    tracing::info!(
        endpoint = %client_config.endpoint,
        max_attempts = client_config.retry_config.max_attempts,
        "Using DeepSource API"
    );
    let client = DeepSourceClient::from_config(client_config, cancel.clone())
        .context("Failed to create DeepSource client")?;

    let mut registry = ToolRegistry::new();
    register_all(&mut registry, &client).context("Failed to register tools")?;
    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(registry).with_cancellation(cancel);
    server.start().await?;

    Ok(())
}

/// Logs go to stderr or `LOG_FILE`; stdout carries the protocol
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match &logging.level {
        Some(level) => EnvFilter::try_new(level).context("Invalid LOG_LEVEL")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "deepsource=info".into()),
    };

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }
    Ok(())
}
