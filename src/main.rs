//! MCP Rust Starter - server binary
//!
//! Serves the starter capabilities over stdio (default) or HTTP.

use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mcp_starter::config::{Args, Config, Transport};
use mcp_starter::error::{Error, Result};
use mcp_starter::mcp::registry::CapabilityKind;
use mcp_starter::mcp::server::McpServer;
use mcp_starter::mcp::transport::StdioTransport;
use mcp_starter::metrics::Metrics;
use mcp_starter::{build_registry, SERVER_INSTRUCTIONS, SERVER_NAME, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --debug
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Config(format!("failed to set tracing subscriber: {}", e)))?;

    // Build configuration from args
    let config = Arc::new(Config::from(args));

    info!("MCP Rust Starter v{}", VERSION);
    info!("Transport: {:?}", config.transport);

    let metrics = Metrics::new();
    let registry = build_registry(&config, &metrics)?;
    info!(
        "Registered {} tools, {} resources, {} resource templates, {} prompts",
        registry.count(CapabilityKind::Tool),
        registry.count(CapabilityKind::Resource),
        registry.count(CapabilityKind::ResourceTemplate),
        registry.count(CapabilityKind::Prompt),
    );

    let server = McpServer::new(registry, metrics, SERVER_NAME).with_instructions(SERVER_INSTRUCTIONS);

    // Start the server based on transport mode
    match config.transport {
        Transport::Stdio => {
            info!("Starting stdio transport...");
            server.run(StdioTransport::new()).await?;
        }
        Transport::Http => {
            info!("Starting HTTP transport on {}...", config.bind_addr());
            mcp_starter::http::start_server(&config, server).await?;
        }
    }

    Ok(())
}
