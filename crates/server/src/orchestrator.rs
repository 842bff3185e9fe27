//! # Recommendation Orchestrator
//!
//! This module coordinates the recommendation pipeline:
//! 1. Fetch the user's ratings and follows (in parallel)
//! 2. Short-circuit users without a taste profile
//! 3. Build the candidate pool from the rating corpus
//! 4. Fetch usernames for the raters behind eligible shows
//! 5. Apply filters and aggregate scores (on the blocking pool)
//! 6. Look up titles and posters in the catalog
//!
//! The home deck wraps the personal pipeline in a fallback cascade
//! (personal -> community this week -> external trending).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

use data_loader::{MediaKind, RecommendStats, Show, ShowId, UserId, ViewingMode};
use pipeline::{FilterPipeline, ScoreAggregator, ShowScore};
use sources::user_context::{build_exclusion_set, build_user_context, MIN_PROFILE_RATINGS};
use sources::{
    Candidate, CandidateSource, Collaborators, CommunitySource, PersonalSource, RatingFilter,
    TrendingFeed, TrendingSource, UserContext,
};

use crate::config::EngineConfig;
use crate::fallback::{FallbackComposer, HasShowId};

/// Personalized recommendation returned to the caller
#[derive(Debug, Clone, Serialize)]
pub struct ShowRecommendation {
    pub show_id: ShowId,
    pub title: String,
    pub poster_path: Option<String>,
    pub media_kind: MediaKind,
    pub score: f32,
    pub explanation: String,
    pub tags: Vec<String>,
    pub recommend_stats: RecommendStats,
    pub rater_count: usize,
}

impl ShowRecommendation {
    fn new(score: ShowScore, show: Show) -> Self {
        Self {
            show_id: score.show_id,
            media_kind: show.media_kind(),
            title: show.title,
            poster_path: show.poster_path,
            score: score.score,
            explanation: score.explanation,
            tags: score.tags,
            recommend_stats: score.stats,
            rater_count: score.rater_count,
        }
    }
}

/// One card of the home deck
#[derive(Debug, Clone, Serialize)]
pub struct HomePick {
    pub show_id: ShowId,
    pub title: String,
    pub poster_path: Option<String>,
    pub source: CandidateSource,
    /// Only personal picks carry a score
    pub score: Option<f32>,
    pub reason: String,
    pub tags: Vec<String>,
    pub recommend_percent: Option<u8>,
}

impl HomePick {
    fn community(candidate: &Candidate, show: Show) -> Self {
        let count = candidate.metadata.positive_count;
        Self {
            show_id: show.id,
            title: show.title,
            poster_path: show.poster_path,
            source: CandidateSource::Community,
            score: None,
            reason: match count {
                1 => "1 recommend this week".to_string(),
                n => format!("{} recommends this week", n),
            },
            tags: Vec::new(),
            recommend_percent: None,
        }
    }

    fn trending(show: Show) -> Self {
        Self {
            show_id: show.id,
            title: show.title,
            poster_path: show.poster_path,
            source: CandidateSource::Trending,
            score: None,
            reason: "Trending now".to_string(),
            tags: Vec::new(),
            recommend_percent: None,
        }
    }
}

impl From<ShowRecommendation> for HomePick {
    fn from(rec: ShowRecommendation) -> Self {
        Self {
            show_id: rec.show_id,
            title: rec.title,
            poster_path: rec.poster_path,
            source: CandidateSource::Personal,
            score: Some(rec.score),
            reason: rec.explanation,
            tags: rec.tags,
            recommend_percent: rec.recommend_stats.percent,
        }
    }
}

impl HasShowId for HomePick {
    fn show_id(&self) -> ShowId {
        self.show_id
    }
}

/// Main orchestrator that coordinates the recommendation pipeline
///
/// Holds only shared handles and immutable settings, so clones can serve
/// concurrent requests.
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    collaborators: Collaborators,
    config: EngineConfig,
    filter_pipeline: Arc<FilterPipeline>,
    aggregator: ScoreAggregator,
    trending: Arc<TrendingSource>,
    /// Pins "now" for every request (tests, replays)
    fixed_now: Option<DateTime<Utc>>,
}

impl RecommendationOrchestrator {
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        let filter_pipeline = Arc::new(FilterPipeline::personal(config.min_raters_per_show));
        let aggregator = ScoreAggregator::new().with_min_raters(config.min_raters_per_show);
        let trending = Arc::new(
            TrendingSource::new(collaborators.trending.clone(), collaborators.catalog.clone())
                .with_fetch_size(config.trending_fetch_size),
        );

        Self {
            collaborators,
            config,
            filter_pipeline,
            aggregator,
            trending,
            fixed_now: None,
        }
    }

    pub fn with_fixed_now(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub(crate) fn trending(&self) -> &TrendingSource {
        &self.trending
    }

    /// Reference time for one request
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    /// Ranked, explained shows the user hasn't rated, best first.
    ///
    /// Empty when the user has rated fewer than `MIN_PROFILE_RATINGS` shows.
    /// Fails when a required read (ratings, follows, profiles, catalog) fails.
    #[instrument(skip(self, exclude))]
    pub async fn get_personalized_recommendations(
        &self,
        user_id: UserId,
        mode: ViewingMode,
        exclude: &HashSet<ShowId>,
    ) -> Result<Vec<ShowRecommendation>> {
        self.personalized_at(user_id, mode, exclude, self.now()).await
    }

    async fn personalized_at(
        &self,
        user_id: UserId,
        mode: ViewingMode,
        exclude: &HashSet<ShowId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ShowRecommendation>> {
        let start_time = Instant::now();

        let own_filter = RatingFilter::all().by_user(user_id);
        let (own_result, follows_result) = tokio::join!(
            self.collaborators.ratings.fetch_ratings(&own_filter),
            self.collaborators.follows.fetch_follows(user_id)
        );
        let own = own_result.context("Failed to fetch the user's ratings")?;
        if own.len() < MIN_PROFILE_RATINGS {
            info!(
                "User {} has {} ratings (need {}), no personal recommendations",
                user_id,
                own.len(),
                MIN_PROFILE_RATINGS
            );
            return Ok(Vec::new());
        }
        let followees = follows_result.context("Failed to fetch follows")?;

        let corpus = self
            .collaborators
            .ratings
            .fetch_ratings(&RatingFilter::all())
            .await
            .context("Failed to fetch the rating corpus")?;
        let context = build_user_context(user_id, mode, now, &own, &followees, exclude);

        let source = tokio::task::spawn_blocking(move || PersonalSource::new(corpus))
            .await
            .context("Candidate pool task panicked")?;
        let raters = source.candidate_raters(&context);
        info!(
            "Candidate pool: {} shows, {} raters to compare",
            source.show_count(),
            raters.len()
        );
        let usernames = self.fetch_usernames(raters).await?;

        let scores = tokio::task::spawn_blocking({
            let pipeline = self.filter_pipeline.clone();
            let aggregator = self.aggregator.clone();
            let context = context.clone();
            move || -> Result<Vec<ShowScore>> {
                let candidates = source.get_candidates(&context, &usernames);
                let filtered = pipeline
                    .apply(candidates, &context)
                    .context("Failed to apply filters")?;
                Ok(aggregator.score_all(&filtered, &context))
            }
        })
        .await
        .context("Scoring task panicked")??;

        let recommendations = self.rank_and_select(scores).await?;
        info!(
            "Selected {} recommendations for user {} in {:.2?}",
            recommendations.len(),
            user_id,
            start_time.elapsed()
        );
        Ok(recommendations)
    }

    /// Usernames for every rater; a missing profile is not an error
    async fn fetch_usernames(&self, raters: BTreeSet<UserId>) -> Result<HashMap<UserId, String>> {
        let lookups = raters.into_iter().map(|user_id| async move {
            (
                user_id,
                self.collaborators.profiles.fetch_username(user_id).await,
            )
        });

        let mut usernames = HashMap::new();
        for (user_id, result) in join_all(lookups).await {
            let username = result
                .with_context(|| format!("Failed to fetch profile for user {}", user_id))?;
            if let Some(username) = username {
                usernames.insert(user_id, username);
            }
        }
        Ok(usernames)
    }

    /// Catalog entries in the order asked for; `None` where the catalog has no row
    pub(crate) async fn fetch_shows(
        &self,
        show_ids: impl IntoIterator<Item = ShowId>,
    ) -> Result<Vec<Option<Show>>> {
        let lookups = show_ids
            .into_iter()
            .map(|show_id| self.collaborators.catalog.fetch_show(show_id));

        join_all(lookups)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to fetch shows from the catalog")
    }

    /// Attach catalog data to sorted scores, skipping shows the catalog lacks
    async fn rank_and_select(&self, scores: Vec<ShowScore>) -> Result<Vec<ShowRecommendation>> {
        let shows = self.fetch_shows(scores.iter().map(|s| s.show_id)).await?;

        let recommendations = scores
            .into_iter()
            .zip(shows)
            .filter_map(|(score, show)| match show {
                Some(show) => Some(ShowRecommendation::new(score, show)),
                None => {
                    warn!("Show {} is missing from the catalog, skipping", score.show_id);
                    None
                }
            })
            .collect();

        Ok(recommendations)
    }

    /// Pair candidates with their catalog rows, keeping candidate order
    pub(crate) async fn resolve_candidates(
        &self,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<(Candidate, Show)>> {
        let shows = self.fetch_shows(candidates.iter().map(|c| c.show_id)).await?;

        Ok(candidates
            .into_iter()
            .zip(shows)
            .filter_map(|(candidate, show)| {
                if show.is_none() {
                    warn!("Show {} is missing from the catalog, skipping", candidate.show_id);
                }
                show.map(|show| (candidate, show))
            })
            .collect())
    }

    /// Rated shows, watched/not-for-me shows, recent dismissals and `explicit`
    pub async fn exclusion_set(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        explicit: &HashSet<ShowId>,
    ) -> Result<HashSet<ShowId>> {
        let own_filter = RatingFilter::all().by_user(user_id);
        let (own_result, actions_result) = tokio::join!(
            self.collaborators.ratings.fetch_ratings(&own_filter),
            self.collaborators.watch_actions.fetch_watch_actions(user_id)
        );
        let own = own_result.context("Failed to fetch the user's ratings")?;
        let actions = actions_result.context("Failed to fetch watch actions")?;

        Ok(build_exclusion_set(
            &own,
            &actions,
            now,
            Duration::days(self.config.dismiss_window_days),
            explicit,
        ))
    }

    /// Context for a popularity tier: nothing known but what to skip
    pub(crate) fn tier_context(
        &self,
        user_id: UserId,
        mode: ViewingMode,
        now: DateTime<Utc>,
        exclude: &HashSet<ShowId>,
        already_placed: &HashSet<ShowId>,
    ) -> UserContext {
        let mut context = UserContext::new(user_id, mode, now);
        context.excluded_shows = exclude.union(already_placed).copied().collect();
        context
    }

    /// Ranked community candidates with catalog rows, up to `limit`
    pub(crate) async fn community_tier(
        &self,
        context: &UserContext,
        source: &CommunitySource,
        limit: usize,
    ) -> Result<Vec<(Candidate, Show)>> {
        let mut filter = RatingFilter::all();
        if let Some(since) = source.window_start(context.now) {
            filter = filter.since(since);
        }

        let ratings = self
            .collaborators
            .ratings
            .fetch_ratings(&filter)
            .await
            .context("Failed to fetch community ratings")?;
        let candidates = source.get_candidates(context, &ratings, limit);
        self.resolve_candidates(candidates).await
    }

    /// The home deck: always best effort, never an error.
    ///
    /// Tiers: personal recommendations, then shows recommended most this
    /// week, then the external trending list.
    #[instrument(skip(self, exclude))]
    pub async fn get_home_picks(
        &self,
        user_id: UserId,
        mode: ViewingMode,
        exclude: &HashSet<ShowId>,
    ) -> Vec<HomePick> {
        let now = self.now();
        let exclusion = match self.exclusion_set(user_id, now, exclude).await {
            Ok(exclusion) => exclusion,
            Err(e) => {
                warn!(
                    "Failed to build exclusion set for user {}, using caller exclusions only: {:#}",
                    user_id, e
                );
                exclude.clone()
            }
        };

        let mut composer = FallbackComposer::new(self.config.home_target);

        let personal = self
            .personalized_at(user_id, mode, &exclusion, now)
            .await
            .map(|recs| recs.into_iter().map(HomePick::from).collect::<Vec<_>>());
        composer.extend_result("personal", personal);

        if !composer.is_full() {
            let context = self.tier_context(user_id, mode, now, &exclusion, composer.seen());
            let community = self
                .community_tier(
                    &context,
                    &CommunitySource::recent_recommends(),
                    composer.remaining(),
                )
                .await
                .map(|items| {
                    items
                        .into_iter()
                        .map(|(candidate, show)| HomePick::community(&candidate, show))
                        .collect::<Vec<_>>()
                });
            composer.extend_result("community", community);
        }

        if !composer.is_full() {
            let context = self.tier_context(user_id, mode, now, &exclusion, composer.seen());
            let trending = self
                .trending
                .get_shows(&context, TrendingFeed::Trending, composer.remaining())
                .await
                .map(|shows| shows.into_iter().map(HomePick::trending).collect::<Vec<_>>());
            composer.extend_result("trending", trending);
        }

        let picks = composer.finish();
        info!("Composed {} home picks for user {}", picks.len(), user_id);
        picks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use data_loader::{DataIndex, FollowEdge, Profile, Rating, WatchAction, WatchActionKind};
    use sources::{CatalogStub, MemoryStore, MemoryTrendingCatalog};

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    fn show(id: ShowId, title: &str) -> Show {
        Show {
            id,
            title: title.to_string(),
            poster_path: Some(format!("/{}.jpg", id)),
            first_air_date: None,
        }
    }

    fn stub(id: ShowId) -> CatalogStub {
        CatalogStub {
            id,
            title: format!("Trending {}", id),
            poster_path: Some(format!("/t{}.jpg", id)),
            first_air_date: Some("2025-01-01".to_string()),
        }
    }

    /// User 1 has a taste profile (shows 1-5). User 2 agrees closely and also
    /// loved 10; user 3 rated 10 and 11. Users 4-6 recommend 20 this week,
    /// user 7 recommends 21.
    fn build_test_index() -> DataIndex {
        let mut index = DataIndex::new();

        for (id, name) in [(1, "ana"), (2, "bea"), (3, "cy")] {
            index.insert_profile(Profile {
                user_id: id,
                username: name.to_string(),
            });
        }
        for (id, title) in [
            (1, "Severance"),
            (2, "The Bear"),
            (3, "Shogun"),
            (4, "Andor"),
            (5, "Hacks"),
            (10, "Slow Horses"),
            (11, "Blue Eye Samurai"),
            (20, "Pachinko"),
            (21, "Reservation Dogs"),
        ] {
            index.upsert_show(show(id, title));
        }

        for (show_id, enjoyment) in [(1, 9.0), (2, 7.0), (3, 4.0), (4, 8.0), (5, 6.0)] {
            index.upsert_rating(Rating::new(1, show_id, enjoyment, days_ago(40)));
        }
        for (show_id, enjoyment) in [(1, 8.5), (2, 7.5), (3, 3.0), (4, 8.0)] {
            index.upsert_rating(Rating::new(2, show_id, enjoyment, days_ago(20)));
        }
        index.upsert_rating(Rating::new(2, 10, 9.0, days_ago(5)).with_recommend(true));
        index.upsert_rating(Rating::new(3, 10, 7.0, days_ago(5)).with_recommend(true));
        index.upsert_rating(Rating::new(3, 11, 8.0, days_ago(5)));
        for user_id in 4..=6 {
            index.upsert_rating(Rating::new(user_id, 20, 8.0, days_ago(2)).with_recommend(true));
        }
        index.upsert_rating(Rating::new(7, 21, 8.0, days_ago(3)).with_recommend(true));

        index.insert_follow(FollowEdge {
            follower: 1,
            followee: 3,
        });
        index
    }

    fn build_orchestrator(index: DataIndex, home_target: usize) -> RecommendationOrchestrator {
        let store = Arc::new(MemoryStore::new(index));
        let trending = Arc::new(MemoryTrendingCatalog::new(
            vec![stub(30), stub(31), stub(32)],
            Vec::new(),
        ));
        let config = EngineConfig {
            home_target,
            ..EngineConfig::default()
        };
        RecommendationOrchestrator::new(Collaborators::from_store(store, trending), config)
            .with_fixed_now(now())
    }

    // ============================================================================
    // Personal pipeline
    // ============================================================================

    #[tokio::test]
    async fn test_personal_recommendations_end_to_end() {
        let orchestrator = build_orchestrator(build_test_index(), 10);

        let recs = orchestrator
            .get_personalized_recommendations(1, ViewingMode::Immediate, &HashSet::new())
            .await
            .unwrap();

        // 11 and 21 have a single rater each
        let ids: Vec<ShowId> = recs.iter().map(|r| r.show_id).collect();
        assert!(ids.contains(&10));
        assert!(!ids.contains(&11));
        assert!(!ids.contains(&21));

        let slow_horses = recs.iter().find(|r| r.show_id == 10).unwrap();
        assert_eq!(slow_horses.title, "Slow Horses");
        assert!(slow_horses.score > 0.0);
        assert!(slow_horses.explanation.contains("@bea • align 0.95"));
        assert!(slow_horses.explanation.contains("★ @cy • align 0.30"));
        assert_eq!(slow_horses.recommend_stats.percent, Some(100));
    }

    #[tokio::test]
    async fn test_users_without_taste_profile_get_nothing() {
        let orchestrator = build_orchestrator(build_test_index(), 10);

        // User 99 has no ratings, user 7 one, user 3 two
        for user_id in [99, 7, 3] {
            let recs = orchestrator
                .get_personalized_recommendations(user_id, ViewingMode::Planned, &HashSet::new())
                .await
                .unwrap();
            assert!(recs.is_empty(), "user {} should be gated", user_id);
        }
    }

    #[tokio::test]
    async fn test_explicit_exclusions_are_honoured() {
        let orchestrator = build_orchestrator(build_test_index(), 10);
        let exclude: HashSet<ShowId> = [10].into_iter().collect();

        let recs = orchestrator
            .get_personalized_recommendations(1, ViewingMode::Immediate, &exclude)
            .await
            .unwrap();
        assert!(recs.iter().all(|r| r.show_id != 10));
    }

    #[tokio::test]
    async fn test_show_missing_from_catalog_is_skipped() {
        let mut index = build_test_index();
        index.upsert_rating(Rating::new(2, 12, 9.0, days_ago(1)));
        index.upsert_rating(Rating::new(3, 12, 9.0, days_ago(1)));
        let orchestrator = build_orchestrator(index, 10);

        let recs = orchestrator
            .get_personalized_recommendations(1, ViewingMode::Immediate, &HashSet::new())
            .await
            .unwrap();
        assert!(recs.iter().all(|r| r.show_id != 12));
        assert!(recs.iter().any(|r| r.show_id == 10));
    }

    // ============================================================================
    // Home deck
    // ============================================================================

    #[tokio::test]
    async fn test_home_picks_cascade_through_tiers() {
        let orchestrator = build_orchestrator(build_test_index(), 5);

        let picks = orchestrator
            .get_home_picks(1, ViewingMode::Immediate, &HashSet::new())
            .await;

        assert_eq!(picks.len(), 5);
        assert_eq!(picks[0].source, CandidateSource::Personal);

        let ids: Vec<ShowId> = picks.iter().map(|p| p.show_id).collect();
        let unique: HashSet<ShowId> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(picks.iter().any(|p| p.source == CandidateSource::Trending));
        for rated in 1..=5 {
            assert!(!unique.contains(&rated));
        }
    }

    #[tokio::test]
    async fn test_home_picks_respect_watch_actions() {
        let mut index = build_test_index();
        index.insert_watch_action(WatchAction {
            user_id: 1,
            show_id: 10,
            kind: WatchActionKind::NotForMe,
            created_at: days_ago(200),
        });
        index.insert_watch_action(WatchAction {
            user_id: 1,
            show_id: 20,
            kind: WatchActionKind::Dismissed,
            created_at: days_ago(3),
        });
        index.insert_watch_action(WatchAction {
            user_id: 1,
            show_id: 30,
            kind: WatchActionKind::Saved,
            created_at: days_ago(1),
        });
        let orchestrator = build_orchestrator(index, 10);

        let picks = orchestrator
            .get_home_picks(1, ViewingMode::Immediate, &HashSet::new())
            .await;
        let ids: HashSet<ShowId> = picks.iter().map(|p| p.show_id).collect();

        assert!(!ids.contains(&10));
        assert!(!ids.contains(&20));
        assert!(ids.contains(&30));
    }

    #[tokio::test]
    async fn test_new_user_home_deck_is_popularity_only() {
        let orchestrator = build_orchestrator(build_test_index(), 3);

        let picks = orchestrator
            .get_home_picks(42, ViewingMode::Planned, &HashSet::new())
            .await;

        let ids: Vec<ShowId> = picks.iter().map(|p| p.show_id).collect();
        // 20 has three recommends this week, 10 two, 21 one
        assert_eq!(ids, vec![20, 10, 21]);
        assert_eq!(picks[0].reason, "3 recommends this week");
        assert!(picks.iter().all(|p| p.source == CandidateSource::Community));
    }
}
