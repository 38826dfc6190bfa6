//! BioScoop CLI - Headless Player and Catalog Tool
//!
//! Features:
//! - Quality levels of a source
//! - Download size estimates
//! - Catalog browsing and search
//! - Downloads and continue-watching lists
//! - Headless playback sessions with resume
//! - Simulated downloads with optional file save

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// BioScoop CLI - Streaming catalog player
#[derive(Parser)]
#[command(name = "bioscoop")]
#[command(author = "BioScoop Developers")]
#[command(version)]
#[command(about = "Headless player and catalog tool for BioScoop", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    /// JSON file backing the content store
    #[arg(short, long, default_value = "bioscoop.json", global = true)]
    store: PathBuf,

    /// Player configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the quality levels offered for a source URL
    Levels {
        /// HLS manifest or progressive file URL
        source: String,
    },

    /// Estimate download sizes
    Estimate {
        /// Content duration in seconds
        #[arg(short, long)]
        duration: f64,

        /// Only this quality
        #[arg(short, long)]
        quality: Option<String>,
    },

    /// Browse the catalog
    Catalog {
        /// Search titles and genres
        #[arg(long)]
        search: Option<String>,

        /// Filter by language
        #[arg(short, long)]
        language: Option<String>,

        /// Only trending content
        #[arg(short, long)]
        trending: bool,
    },

    /// List recorded downloads
    Downloads {
        /// Remove the downloads of a content id
        #[arg(long)]
        remove: Option<String>,
    },

    /// Show the continue-watching list
    Continue,

    /// Play a catalog item headlessly
    Play {
        /// Content id
        content_id: String,

        /// Season number (series)
        #[arg(long)]
        season: Option<u32>,

        /// Episode number (series)
        #[arg(long)]
        episode: Option<u32>,

        /// Seconds of playback to simulate
        #[arg(long, default_value = "30")]
        seconds: u32,

        /// Duration reported by the simulated element
        #[arg(long, default_value = "3600")]
        duration: f64,

        /// JSON file with a chapter list (`[{"id", "title", "startTime"}]`)
        #[arg(long)]
        chapters: Option<PathBuf>,

        /// Jump to this chapter id once metadata is loaded
        #[arg(long, requires = "chapters")]
        seek_chapter: Option<String>,
    },

    /// Run a simulated download of a catalog item
    Download {
        /// Content id
        content_id: String,

        /// Season number (series)
        #[arg(long)]
        season: Option<u32>,

        /// Episode number (series)
        #[arg(long)]
        episode: Option<u32>,

        /// Quality to download
        #[arg(short, long, default_value = "1080p")]
        quality: String,

        /// Save progressive sources into this directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Duration used for the size estimate
        #[arg(long, default_value = "3600")]
        duration: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();
    bioscoop_core::init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Levels { source } => {
            commands::levels(&source, &cli.format).await?;
        }
        Commands::Estimate { duration, quality } => {
            commands::estimate(&config, duration, quality.as_deref(), &cli.format)?;
        }
        Commands::Catalog { search, language, trending } => {
            let filter = commands::CatalogFilter { search, language, trending };
            commands::catalog(&cli.store, filter, &cli.format).await?;
        }
        Commands::Downloads { remove } => {
            commands::downloads(&cli.store, remove.as_deref(), &cli.format).await?;
        }
        Commands::Continue => {
            commands::continue_watching(&cli.store, &cli.format).await?;
        }
        Commands::Play { content_id, season, episode, seconds, duration, chapters, seek_chapter } => {
            let item = commands::ItemRef { content_id, season, episode };
            let options = commands::PlayOptions { seconds, duration, chapters, seek_chapter };
            commands::play(&cli.store, config, item, options, &cli.format).await?;
        }
        Commands::Download { content_id, season, episode, quality, out, duration } => {
            let item = commands::ItemRef { content_id, season, episode };
            commands::download(&cli.store, config, item, &quality, out, duration, &cli.format)
                .await?;
        }
    }

    Ok(())
}
