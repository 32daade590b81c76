//! Operator CLI for bookmark upkeep
//!
//! Works on a JSON file holding an array of bookmarks. Results are written
//! to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bookmark_upkeep::{
    BookmarkId, HealthRecord, HealthStats, MemoryBookmarkRepository, MergeRequest, SweepReport,
    UpkeepConfig, UpkeepService,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "upkeep")]
#[command(about = "Check bookmark health and consolidate duplicates")]
struct Cli {
    /// JSON file holding the bookmark array
    #[arg(long, env = "UPKEEP_BOOKMARKS", default_value = "bookmarks.json")]
    bookmarks: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one health sweep over every bookmark
    Check,

    /// Check a single bookmark now
    CheckOne { id: BookmarkId },

    /// Sweep on the configured interval until Ctrl-C
    Watch,

    /// List duplicate groups
    Duplicates,

    /// Check a URL against the corpus before adding it
    Candidate {
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        title: String,
    },

    /// Merge duplicates into a primary bookmark and save the file
    Merge {
        #[arg(long)]
        primary: BookmarkId,
        #[arg(long, num_args = 1.., required = true)]
        duplicates: Vec<BookmarkId>,
        /// Keep the primary's tags as they are
        #[arg(long)]
        no_tags: bool,
        /// Keep the primary's title and description as they are
        #[arg(long)]
        no_metadata: bool,
    },
}

#[derive(Serialize)]
struct CheckOutput {
    report: SweepReport,
    stats: HealthStats,
    records: Vec<HealthRecord>,
}

fn output<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bookmark_upkeep=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = UpkeepConfig::from_env().context("Failed to load configuration")?;

    let repo = Arc::new(
        MemoryBookmarkRepository::load_json(&cli.bookmarks)
            .await
            .with_context(|| format!("Failed to load bookmarks from {}", cli.bookmarks.display()))?,
    );
    tracing::info!(bookmarks = repo.len(), path = %cli.bookmarks.display(), "Bookmarks loaded");

    let service = UpkeepService::with_http(Arc::clone(&repo), config)
        .context("Failed to create upkeep service")?;

    match cli.command {
        Commands::Check => {
            let report = service
                .run_health_sweep()
                .await
                .context("Sweep task failed")??;
            let stats = service.get_health_stats().await?;
            output(&CheckOutput {
                report,
                stats,
                records: service.get_all_health(),
            })?;
        }

        Commands::CheckOne { id } => {
            let record = service.check_bookmark_now(id).await?;
            output(&record)?;
        }

        Commands::Watch => {
            service.start_health_sweeps();
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            service.stop_health_sweeps();
            output(&service.get_health_stats().await?)?;
        }

        Commands::Duplicates => {
            let groups = service.find_all_duplicates().await?;
            output(&groups)?;
        }

        Commands::Candidate { url, title } => {
            let result = service.check_for_duplicates(&url, &title).await?;
            output(&result)?;
        }

        Commands::Merge {
            primary,
            duplicates,
            no_tags,
            no_metadata,
        } => {
            let request = MergeRequest::new(primary, duplicates)
                .with_merge_tags(!no_tags)
                .with_merge_metadata(!no_metadata);
            let report = service.merge_duplicates(&request).await?;

            repo.save_json(&cli.bookmarks)
                .await
                .with_context(|| format!("Failed to save bookmarks to {}", cli.bookmarks.display()))?;
            output(&report)?;
        }
    }

    Ok(())
}
