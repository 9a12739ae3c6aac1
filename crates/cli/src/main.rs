//! Teco CLI - Database migrations and platform maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run platform database migrations
//! teco-cli migrate
//!
//! # Rebuild the on-disk store search index from the database
//! teco-cli reindex --dir /var/lib/teco/index
//!
//! # Ask cache servers to flush everything, or a single region
//! teco-cli cache flush
//! teco-cli cache flush --region catalog
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `reindex` - Rebuild the store search index
//! - `cache flush` - Send a cache management message to the broker

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "teco-cli")]
#[command(author, version, about = "Teco platform CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Rebuild the store search index from the database
    Reindex {
        /// Index directory (defaults to `TECO_SEARCH_INDEX_DIR`)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Manage cache servers
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Ask cache servers to flush
    Flush {
        /// Only flush this region
        #[arg(short, long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Reindex { dir } => {
            commands::index::reindex(dir).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Flush { region } => {
                commands::cache::flush(region).await?;
            }
        },
    }
    Ok(())
}
