//! Example: Generate candidates for a user
//!
//! Run with: cargo run --package sources --example generate_candidates
//!
//! This example shows how to:
//! 1. Load the sample fixture directory
//! 2. Build the exclusion set and user context
//! 3. Generate personal (similar-user) candidates
//! 4. Generate community (popularity) candidates
//! 5. Display the results

use chrono::{Duration, Utc};
use data_loader::{DataIndex, Rating, ViewingMode};
use sources::user_context::{build_exclusion_set, build_user_context, DISMISS_WINDOW_DAYS};
use sources::{CommunitySource, PersonalSource};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Show Candidate Generation Example ===\n");

    println!("Loading sample fixtures...");
    let start = Instant::now();
    let index = DataIndex::load_from_files(Path::new("data/sample"))?;
    println!("Loaded fixtures in {:?}\n", start.elapsed());

    let user_id = 1;
    let now = Utc::now();
    let own: Vec<Rating> = index.get_user_ratings(user_id).into_iter().cloned().collect();
    let followees = index.get_followees(user_id);

    let exclude = build_exclusion_set(
        &own,
        index.get_watch_actions(user_id),
        now,
        Duration::days(DISMISS_WINDOW_DAYS),
        &HashSet::new(),
    );
    let context = build_user_context(
        user_id,
        ViewingMode::Immediate,
        now,
        &own,
        &followees,
        &exclude,
    );
    println!("Target User: {}", user_id);
    println!("  Rated shows: {}", context.rated_shows.len());
    println!("  Following: {}", context.followees.len());
    println!("  Excluded: {}\n", context.excluded_shows.len());

    let usernames: HashMap<_, _> = index
        .get_all_user_ids()
        .into_iter()
        .filter_map(|id| index.get_profile(id).map(|p| (id, p.username.clone())))
        .collect();
    let corpus: Vec<Rating> = index.all_ratings().cloned().collect();

    println!("Generating personal candidates...");
    let start = Instant::now();
    let personal = PersonalSource::new(corpus.clone());
    let personal_candidates = personal.get_candidates(&context, &usernames);
    println!(
        "Generated {} personal candidates in {:?}",
        personal_candidates.len(),
        start.elapsed()
    );
    for candidate in personal_candidates.iter().take(5) {
        let title = index
            .get_show(candidate.show_id)
            .map(|s| s.title.as_str())
            .unwrap_or("<not in catalog>");
        println!(
            "  - {} ({} raters, {} recommend)",
            title,
            candidate.distinct_raters(),
            candidate.metadata.positive_count
        );
    }

    println!("\nGenerating community candidates...");
    let community_candidates =
        CommunitySource::all_time_favorites().get_candidates(&context, &corpus, 5);
    for (i, candidate) in community_candidates.iter().enumerate() {
        if let Some(show) = index.get_show(candidate.show_id) {
            println!(
                "  {}. {} ({} favorites)",
                i + 1,
                show.title,
                candidate.base_score
            );
        }
    }

    Ok(())
}
