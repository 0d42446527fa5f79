//! MedRoute CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  Write a default config file
//! - `route`    Route a single message and print the result as JSON
//! - `chat`     Interactive dialogue: route, then answer, every turn
//! - `index`    Load the catalog and show per-category counts
//! - `doctor`   Diagnose configuration and data

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "medroute",
    about = "MedRoute: intent routing and context assembly for medical dialogue",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Route one message and print the routing result
    Route {
        /// The user message
        #[arg(short, long)]
        message: String,

        /// JSON file with prior messages (`[{"role": "user", "content": "..."}]`)
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Chat interactively
    Chat,

    /// Load the document catalog and show what was indexed
    Index {
        /// Override the data directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Diagnose configuration and data
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Route { message, history } => commands::route::run(message, history).await?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Index { data_dir } => commands::index::run(data_dir).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
