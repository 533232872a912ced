//! Perimeter MCP Server
//!
//! This binary runs the boundary gate as an MCP server over stdio.
//! It exposes `check_command` and `reload_policy` tools.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use perimeter::BoundaryPolicy;
use perimeter_mcp::PerimeterServer;
use rmcp::ServiceExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Perimeter MCP Server - boundary verdicts for shell commands
#[derive(Parser, Debug)]
#[command(name = "perimeter-mcp")]
#[command(about = "MCP server ruling on shell commands by working directory")]
struct Args {
    /// Policy file (TOML)
    #[arg(long, env = "PERIMETER_CONFIG")]
    config: Option<PathBuf>,

    /// Allow every command (ignores --config)
    #[arg(long)]
    permissive: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing - output to stderr so it doesn't interfere with MCP stdio
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let server = if args.permissive {
        PerimeterServer::new(BoundaryPolicy::allow_all(), None)
    } else {
        let path = args
            .config
            .context("no policy file: pass --config or set PERIMETER_CONFIG")?;
        PerimeterServer::from_file(&path)
            .with_context(|| format!("loading policy {}", path.display()))?
    };

    tracing::info!("Starting Perimeter MCP server");

    // Serve over stdio
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("Failed to start MCP service: {}", e);
        })?;

    tracing::info!("Perimeter MCP server running");

    // Wait for the service to complete
    service.waiting().await?;

    tracing::info!("Perimeter MCP server shutting down");

    Ok(())
}
