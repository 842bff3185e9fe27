use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{DataIndex, ShowId, UserId, ViewingMode};
use server::{
    calculate_similarity, compute_recommend_stats, EngineConfig, HomePick,
    RecommendationOrchestrator, ShelfItem, ShelfKind, ShowRecommendation,
};
use sources::similarity::enjoyment_map;
use sources::{Collaborators, MemoryStore, MemoryTrendingCatalog};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// show-recs - personalized show recommendations from community ratings
#[derive(Parser)]
#[command(name = "show-recs")]
#[command(about = "Show recommendation engine driven by taste similarity", long_about = None)]
struct Cli {
    /// Path to a fixture directory (profiles/shows/ratings/... as JSON lines)
    #[arg(short, long, default_value = "data/sample")]
    data_dir: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Personalized recommendations for a user
    Recommend {
        /// Defaults to the dev user when RECS_DEV_MODE is on
        #[arg(long)]
        user_id: Option<UserId>,

        /// immediate (tonight) or planned (weekend)
        #[arg(long, default_value = "immediate")]
        mode: ViewingMode,

        /// Show ids to leave out, comma separated
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<ShowId>,

        /// Number of recommendations to print
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Print score breakdown for each recommendation
        #[arg(long)]
        explain: bool,
    },

    /// The home deck: personal picks topped up with community and trending
    Home {
        #[arg(long)]
        user_id: Option<UserId>,

        #[arg(long, default_value = "immediate")]
        mode: ViewingMode,
    },

    /// A discovery shelf (friends, trending, favorites)
    Shelf {
        #[arg(long)]
        user_id: Option<UserId>,

        #[arg(long)]
        kind: ShelfKind,
    },

    /// Community recommend stats for a show
    Stats {
        #[arg(long)]
        show_id: ShowId,
    },

    /// Taste similarity of one user to another
    Similarity {
        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        other_id: UserId,
    },

    /// Show a user's profile and rating history
    User {
        #[arg(long)]
        user_id: UserId,
    },

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

/// Everything the commands need, built once from the fixture directory
struct Engine {
    store: Arc<MemoryStore>,
    orchestrator: RecommendationOrchestrator,
}

impl Engine {
    fn load(cli: &Cli) -> Result<Self> {
        let config = EngineConfig::from_env().context("Failed to load engine config")?;

        let index = DataIndex::load_from_files(&cli.data_dir)
            .context("Failed to load fixture directory")?;
        let trending = MemoryTrendingCatalog::load_from_dir(&cli.data_dir)
            .context("Failed to load trending lists")?;

        let store = Arc::new(MemoryStore::new(index));
        let collaborators = Collaborators::from_store(store.clone(), Arc::new(trending));
        let orchestrator = RecommendationOrchestrator::new(collaborators, config);

        Ok(Self {
            store,
            orchestrator,
        })
    }

    fn resolve_user(&self, user_id: Option<UserId>) -> Result<UserId> {
        Ok(self.orchestrator.config().resolve_user(user_id)?)
    }

    fn with_index<T>(&self, f: impl FnOnce(&DataIndex) -> T) -> Result<T> {
        Ok(self.store.with_index(f)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let start = Instant::now();
    let engine = Engine::load(&cli)?;
    if !cli.json {
        let (profiles, shows, ratings) = engine.with_index(|index| index.counts())?;
        println!(
            "{} Loaded {} profiles, {} shows, {} ratings from {} in {:?}",
            "✓".green(),
            profiles,
            shows,
            ratings,
            cli.data_dir.display(),
            start.elapsed()
        );
    }

    match cli.command {
        Commands::Recommend {
            user_id,
            mode,
            ref exclude,
            limit,
            explain,
        } => {
            let user_id = engine.resolve_user(user_id)?;
            let exclude: HashSet<ShowId> = exclude.iter().copied().collect();
            handle_recommend(&engine, user_id, mode, &exclude, limit, explain, cli.json).await?
        }
        Commands::Home { user_id, mode } => {
            let user_id = engine.resolve_user(user_id)?;
            handle_home(&engine, user_id, mode, cli.json).await?
        }
        Commands::Shelf { user_id, kind } => {
            let user_id = engine.resolve_user(user_id)?;
            handle_shelf(&engine, user_id, kind, cli.json).await?
        }
        Commands::Stats { show_id } => handle_stats(&engine, show_id, cli.json)?,
        Commands::Similarity { user_id, other_id } => {
            handle_similarity(&engine, user_id, other_id, cli.json)?
        }
        Commands::User { user_id } => handle_user(&engine, user_id)?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(&engine, requests, concurrent).await?,
    }

    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(
    engine: &Engine,
    user_id: UserId,
    mode: ViewingMode,
    exclude: &HashSet<ShowId>,
    limit: usize,
    explain: bool,
    json: bool,
) -> Result<()> {
    let start = Instant::now();
    let mut recommendations = engine
        .orchestrator
        .get_personalized_recommendations(user_id, mode, exclude)
        .await?;
    recommendations.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&recommendations)?);
        return Ok(());
    }

    if recommendations.is_empty() {
        println!(
            "{}",
            "No personal recommendations yet (rate a few more shows).".yellow()
        );
        return Ok(());
    }
    print_recommendations(&recommendations, mode, explain);
    println!("{}", format!("({:?})", start.elapsed()).dimmed());
    Ok(())
}

/// Handle the 'home' command
async fn handle_home(engine: &Engine, user_id: UserId, mode: ViewingMode, json: bool) -> Result<()> {
    let picks = engine
        .orchestrator
        .get_home_picks(user_id, mode, &HashSet::new())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&picks)?);
        return Ok(());
    }

    println!("{}", format!("Home for user {} ({})", user_id, mode).bold().blue());
    for (i, pick) in picks.iter().enumerate() {
        print_pick(i + 1, pick);
    }
    Ok(())
}

/// Handle the 'shelf' command
async fn handle_shelf(engine: &Engine, user_id: UserId, kind: ShelfKind, json: bool) -> Result<()> {
    let items = engine.orchestrator.get_shelf(user_id, kind).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!("{}", kind.title().bold().blue());
    for item in &items {
        print_shelf_item(item);
    }
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(engine: &Engine, show_id: ShowId, json: bool) -> Result<()> {
    let (title, stats) = engine.with_index(|index| {
        let title = index.get_show(show_id).map(|s| s.title.clone());
        let stats = compute_recommend_stats(index.get_show_ratings(show_id));
        (title, stats)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let title = title.unwrap_or_else(|| format!("Show {}", show_id));
    println!("{}", title.bold().blue());
    println!("{}Answered recommend: {}", "• ".cyan(), stats.total);
    println!("{}Recommends: {}", "• ".cyan(), stats.positive);
    match stats.percent {
        Some(percent) => println!("{}{}% recommend", "• ".cyan(), percent),
        None => println!("{}No one answered the recommend question", "• ".cyan()),
    }
    Ok(())
}

/// Handle the 'similarity' command
fn handle_similarity(engine: &Engine, user_id: UserId, other_id: UserId, json: bool) -> Result<()> {
    let (similarity, shared) = engine.with_index(|index| {
        let mine = enjoyment_map(index.get_user_ratings(user_id));
        let theirs = enjoyment_map(index.get_user_ratings(other_id));
        let shared = mine.keys().filter(|id| theirs.contains_key(id)).count();
        (calculate_similarity(&mine, &theirs), shared)
    })?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "user_id": user_id,
                "other_id": other_id,
                "shared_shows": shared,
                "similarity": similarity,
            })
        );
        return Ok(());
    }

    println!(
        "Similarity of user {} to user {}: {} ({} shared shows)",
        other_id,
        user_id,
        format!("{:.2}", similarity).green().bold(),
        shared
    );
    if shared < sources::MIN_SHARED_SHOWS {
        println!(
            "{}",
            format!(
                "Fewer than {} shared shows, using the default similarity",
                sources::MIN_SHARED_SHOWS
            )
            .dimmed()
        );
    }
    Ok(())
}

/// Handle the 'user' command
fn handle_user(engine: &Engine, user_id: UserId) -> Result<()> {
    engine.with_index(|index| -> Result<()> {
        let ratings = index.get_user_ratings(user_id);
        let username = index
            .get_profile(user_id)
            .map(|p| p.username.clone())
            .ok_or_else(|| anyhow!("User {} not found", user_id))?;

        println!("{}", format!("@{} (user {})", username, user_id).bold().blue());

        let num_ratings = ratings.len();
        let avg_enjoyment = if num_ratings > 0 {
            ratings.iter().map(|r| r.enjoyment).sum::<f32>() / num_ratings as f32
        } else {
            0.0
        };
        println!("{}Number of ratings: {}", "• ".cyan(), num_ratings);
        println!("{}Average enjoyment: {:.2}", "• ".cyan(), avg_enjoyment);

        let followees = index.get_followees(user_id);
        println!("{}Following: {}", "• ".cyan(), followees.len());
        println!(
            "{}Watch actions: {}",
            "• ".cyan(),
            index.get_watch_actions(user_id).len()
        );

        let mut top_rated = ratings.clone();
        top_rated.sort_by(|a, b| {
            b.enjoyment
                .partial_cmp(&a.enjoyment)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.show_id.cmp(&b.show_id))
        });
        println!("Top rated shows:");
        for rating in top_rated.iter().take(5) {
            let title = index
                .get_show(rating.show_id)
                .map(|s| s.title.as_str())
                .unwrap_or("(not in catalog)");
            let recommend = match rating.recommend {
                Some(true) => " 👍",
                Some(false) => " 👎",
                None => "",
            };
            println!("  - {} ({:.1}){}", title, rating.enjoyment, recommend);
        }
        Ok(())
    })?
}

/// Handle the 'benchmark' command
async fn handle_benchmark(engine: &Engine, requests: usize, concurrent: usize) -> Result<()> {
    let all_users = engine.with_index(|index| index.get_all_user_ids())?;
    if all_users.is_empty() || requests == 0 {
        return Err(anyhow!("Nothing to benchmark"));
    }

    let user_ids: Vec<UserId> = (0..requests)
        .map(|_| all_users[rand::random::<u32>() as usize % all_users.len()])
        .collect();

    let semaphore = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall_clock = Instant::now();
    let mut handles = vec![];
    for user_id in user_ids {
        let orchestrator = engine.orchestrator.clone();
        let semaphore = semaphore.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let start = Instant::now();
            orchestrator
                .get_personalized_recommendations(user_id, ViewingMode::Immediate, &HashSet::new())
                .await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        });
        handles.push(handle);
    }

    let mut timings: Vec<Duration> = vec![];
    for handle in handles {
        timings.push(handle.await??);
    }
    let total_time = wall_clock.elapsed();

    timings.sort();
    let percentile = |p: f32| timings[((timings.len() as f32 * p) as usize).min(timings.len() - 1)];
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;
    let throughput = requests as f32 / total_time.as_secs_f32();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Helper function to format and print recommendations
fn print_recommendations(recommendations: &[ShowRecommendation], mode: ViewingMode, explain: bool) {
    println!("{}", format!("Recommendations ({})", mode).bold().blue());
    for (i, rec) in recommendations.iter().enumerate() {
        let percent = rec
            .recommend_stats
            .percent
            .map(|p| format!(" {}% recommend", p))
            .unwrap_or_default();
        println!(
            "{}. {} [{:?}] - Score: {:.2}{}",
            (i + 1).to_string().green(),
            rec.title,
            rec.media_kind,
            rec.score,
            percent.cyan()
        );
        println!("   {}", rec.explanation.dimmed());
        if explain {
            println!(
                "   raters: {}, tags: {}",
                rec.rater_count,
                if rec.tags.is_empty() {
                    "-".to_string()
                } else {
                    rec.tags.join(", ")
                }
            );
        }
    }
}

fn print_pick(rank: usize, pick: &HomePick) {
    let score = pick
        .score
        .map(|s| format!(" {:.2}", s))
        .unwrap_or_default();
    println!(
        "{}. {} [{:?}]{} - {}",
        rank.to_string().green(),
        pick.title,
        pick.source,
        score,
        pick.reason.dimmed()
    );
}

fn print_shelf_item(item: &ShelfItem) {
    let label = item.stats_label();
    let label = if item.stats.is_some() {
        label.cyan()
    } else {
        label.red()
    };
    println!("  - {} - {} ({})", item.title, item.subtitle, label);
}
