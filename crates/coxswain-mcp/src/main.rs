//! Coxswain MCP server
//!
//! Claims-aware MCP server for Kubernetes clusters.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coxswain_mcp::{Cli, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; logs go to stderr so the stdio transport keeps
    // stdout clean for JSON-RPC
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    cli.run().await
}
