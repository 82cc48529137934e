use clap::{Parser, Subcommand};
use civic_data_mcp::Result;
use civic_data_mcp::commands::{serve_mcp, show_status};
use civic_data_mcp::config::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "civic-data-mcp")]
#[command(about = "MCP server for free government and open-data APIs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio (default)
    Serve,
    /// Show which APIs are available with the current environment
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve_mcp(config).await?;
        }
        Commands::Status => {
            show_status(&config);
        }
    }

    Ok(())
}
