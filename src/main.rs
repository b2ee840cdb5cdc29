use anyhow::Result;
use clap::{Parser, Subcommand};
use eventmatch::config;
use tracing_subscriber::EnvFilter;

mod cli;
mod server;
mod tools;

#[derive(Parser)]
#[command(name = "eventmatch", version, about = "Personalized event recommendation server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport unless configured otherwise)
    Serve {
        /// Serve Streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,
    },
    /// Print recommendations for a user
    Recommend {
        /// User ID
        user_id: String,
        /// Maximum number of events to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Regenerate every user and event embedding with the configured model
    ReEmbed,
    /// Check database health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::EventMatchConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { http } => {
            if http || config.server.transport == "http" {
                server::serve_http(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        Command::Recommend { user_id, limit } => {
            cli::recommend::recommend(&config, &user_id, limit).await?;
        }
        Command::ReEmbed => {
            cli::re_embed::re_embed(&config).await?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config)?;
        }
    }

    Ok(())
}
