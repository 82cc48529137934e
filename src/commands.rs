use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::apis::{ApiContext, ToolGroup};
use crate::config::Config;
use crate::mcp::McpServer;
use crate::mcp::tools::register_api_tools;

/// Serve the MCP protocol on stdio until the client disconnects or the
/// process is interrupted.
///
/// Stdout carries the protocol, so everything meant for a human goes to
/// stderr.
#[inline]
pub async fn serve_mcp(config: Config) -> Result<()> {
    eprintln!("{}", config.availability_summary());
    info!(
        "Starting civic-data-mcp with a {}s request timeout",
        config.timeout_seconds
    );

    let context = Arc::new(ApiContext::new(config));

    let server = Arc::new(McpServer::new(
        "civic-data-mcp".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    ));
    register_api_tools(&server, context).await;

    tokio::select! {
        result = Arc::clone(&server).serve_stdio() => {
            result.context("MCP server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("MCP server shutdown complete");
    Ok(())
}

/// Print which API families are usable with the current environment
#[inline]
pub fn show_status(config: &Config) {
    println!("📊 civic-data-mcp Status Report");
    println!("{}", "=".repeat(50));
    println!();
    println!("{}", config.availability_summary());
    println!();
    println!("⏱️  Request timeout: {}s", config.timeout_seconds);

    let tool_count: usize = ToolGroup::ALL
        .iter()
        .map(|group| group.tools().len())
        .sum();
    println!("🔧 Tools available: {}", tool_count);
}
