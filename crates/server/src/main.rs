//! Simple harness for the recommendation orchestrator.
//!
//! Loads a fixture directory into the in-memory store and prints the home
//! deck and every shelf for one user.
//!
//! Usage: `server [--data-dir DIR] [--user-id ID]` (defaults: `data/sample`,
//! the configured dev user).

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use data_loader::{DataIndex, UserId, ViewingMode};
use server::{EngineConfig, RecommendationOrchestrator, ShelfKind};
use sources::{Collaborators, MemoryStore, MemoryTrendingCatalog};

#[derive(Parser)]
#[command(name = "server", about = "Print the home deck and shelves for one user")]
struct Args {
    /// Fixture directory to load
    #[arg(long, default_value = "data/sample")]
    data_dir: PathBuf,

    /// Defaults to the dev user when RECS_DEV_MODE is on
    #[arg(long)]
    user_id: Option<UserId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug,sources=debug,pipeline=debug")),
        )
        .init();

    info!("Starting show recommendation harness");

    let args = Args::parse();
    let data_dir = args.data_dir;

    let config = EngineConfig::from_env()?;
    let user_id = config.resolve_user(args.user_id)?;

    info!("Loading fixtures from {:?}", data_dir);
    let index = DataIndex::load_from_files(&data_dir)?;
    let trending = MemoryTrendingCatalog::load_from_dir(&data_dir)?;
    let collaborators =
        Collaborators::from_store(Arc::new(MemoryStore::new(index)), Arc::new(trending));
    let orchestrator = RecommendationOrchestrator::new(collaborators, config);

    let picks = orchestrator
        .get_home_picks(user_id, ViewingMode::Immediate, &HashSet::new())
        .await;
    info!("Home deck for user {} ({} picks):", user_id, picks.len());
    for (i, pick) in picks.iter().enumerate() {
        info!(
            "{}. {} [{:?}] {}",
            i + 1,
            pick.title,
            pick.source,
            pick.reason
        );
    }

    for kind in ShelfKind::ALL {
        let items = orchestrator.get_shelf(user_id, kind).await;
        info!("{}:", kind.title());
        for item in &items {
            info!("   {} - {} ({})", item.title, item.subtitle, item.stats_label());
        }
    }

    Ok(())
}
