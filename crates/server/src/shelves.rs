//! Discovery shelves.
//!
//! Each shelf is a short fallback cascade, filled to the configured shelf
//! size (3 by default). Items are decorated with the show's community
//! recommend stats, fetched per show in parallel.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

use data_loader::{RecommendStats, Show, ShowId, UserId, ViewingMode, compute_recommend_stats};
use sources::{
    Candidate, CandidateSource, CommunitySource, RatingFilter, SocialSource, TrendingFeed,
};

use crate::fallback::{FallbackComposer, HasShowId};
use crate::orchestrator::RecommendationOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShelfKind {
    FriendsWatching,
    TrendingThisWeek,
    CommunityFavorites,
}

impl ShelfKind {
    pub const ALL: [ShelfKind; 3] = [
        ShelfKind::FriendsWatching,
        ShelfKind::TrendingThisWeek,
        ShelfKind::CommunityFavorites,
    ];

    /// Heading shown above the shelf
    pub fn title(&self) -> &'static str {
        match self {
            ShelfKind::FriendsWatching => "Friends are watching",
            ShelfKind::TrendingThisWeek => "Trending this week",
            ShelfKind::CommunityFavorites => "Community favorites",
        }
    }
}

impl FromStr for ShelfKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "friends" | "friends_watching" => Ok(ShelfKind::FriendsWatching),
            "trending" | "trending_this_week" => Ok(ShelfKind::TrendingThisWeek),
            "favorites" | "community_favorites" => Ok(ShelfKind::CommunityFavorites),
            other => Err(format!("unknown shelf '{}'", other)),
        }
    }
}

impl fmt::Display for ShelfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShelfKind::FriendsWatching => "friends_watching",
            ShelfKind::TrendingThisWeek => "trending_this_week",
            ShelfKind::CommunityFavorites => "community_favorites",
        };
        write!(f, "{}", name)
    }
}

/// One entry on a discovery shelf
#[derive(Debug, Clone, Serialize)]
pub struct ShelfItem {
    pub show_id: ShowId,
    pub title: String,
    pub poster_path: Option<String>,
    pub source: CandidateSource,
    pub subtitle: String,
    /// `None` when the stats lookup failed
    pub stats: Option<RecommendStats>,
}

impl ShelfItem {
    fn new(show: Show, source: CandidateSource, subtitle: String) -> Self {
        Self {
            show_id: show.id,
            title: show.title,
            poster_path: show.poster_path,
            source,
            subtitle,
            stats: None,
        }
    }

    /// Short recommend-rate label; a failed stats lookup reads differently
    /// from a show nobody has answered for yet
    pub fn stats_label(&self) -> String {
        match self.stats {
            None => "stats unavailable".to_string(),
            Some(RecommendStats { percent: None, .. }) => "no recommends yet".to_string(),
            Some(RecommendStats {
                percent: Some(percent),
                ..
            }) => format!("{}% recommend", percent),
        }
    }
}

impl HasShowId for ShelfItem {
    fn show_id(&self) -> ShowId {
        self.show_id
    }
}

fn plural(count: u32, one: &str, many: &str) -> String {
    if count == 1 {
        format!("1 {}", one)
    } else {
        format!("{} {}", count, many)
    }
}

fn social_items(items: Vec<(Candidate, Show)>) -> Vec<ShelfItem> {
    items
        .into_iter()
        .map(|(candidate, show)| {
            let subtitle = plural(
                candidate.metadata.rater_count,
                "friend rated this week",
                "friends rated this week",
            );
            ShelfItem::new(show, CandidateSource::Social, subtitle)
        })
        .collect()
}

fn community_items(items: Vec<(Candidate, Show)>, one: &str, many: &str) -> Vec<ShelfItem> {
    items
        .into_iter()
        .map(|(candidate, show)| {
            let subtitle = plural(candidate.metadata.positive_count, one, many);
            ShelfItem::new(show, CandidateSource::Community, subtitle)
        })
        .collect()
}

fn catalog_items(shows: Vec<Show>, subtitle: &str) -> Vec<ShelfItem> {
    shows
        .into_iter()
        .map(|show| ShelfItem::new(show, CandidateSource::Trending, subtitle.to_string()))
        .collect()
}

impl RecommendationOrchestrator {
    /// Fetch a shelf by kind
    pub async fn get_shelf(&self, user_id: UserId, kind: ShelfKind) -> Vec<ShelfItem> {
        match kind {
            ShelfKind::FriendsWatching => self.get_friends_watching(user_id).await,
            ShelfKind::TrendingThisWeek => self.get_trending_this_week(user_id).await,
            ShelfKind::CommunityFavorites => self.get_community_favorites(user_id).await,
        }
    }

    /// Followees' ratings this week, then community recommends this week,
    /// then the external trending list
    #[instrument(skip(self))]
    pub async fn get_friends_watching(&self, user_id: UserId) -> Vec<ShelfItem> {
        let now = self.now();
        let mut composer = FallbackComposer::new(self.config().shelf_target);

        let social = self
            .social_tier(user_id, now, composer.remaining())
            .await
            .map(social_items);
        composer.extend_result("friends", social);

        if !composer.is_full() {
            let community = self
                .shelf_community_tier(user_id, now, &composer, CommunitySource::recent_recommends())
                .await
                .map(|items| community_items(items, "recommend this week", "recommends this week"));
            composer.extend_result("community", community);
        }

        if !composer.is_full() {
            let trending = self
                .shelf_catalog_tier(user_id, now, &composer, TrendingFeed::Trending)
                .await
                .map(|shows| catalog_items(shows, "Trending now"));
            composer.extend_result("trending", trending);
        }

        self.finish_shelf(ShelfKind::FriendsWatching, user_id, composer).await
    }

    /// Community recommends this week, then all-time favorites, then the
    /// external trending list
    #[instrument(skip(self))]
    pub async fn get_trending_this_week(&self, user_id: UserId) -> Vec<ShelfItem> {
        let now = self.now();
        let mut composer = FallbackComposer::new(self.config().shelf_target);

        let recent = self
            .shelf_community_tier(user_id, now, &composer, CommunitySource::recent_recommends())
            .await
            .map(|items| community_items(items, "recommend this week", "recommends this week"));
        composer.extend_result("community_week", recent);

        if !composer.is_full() {
            let favorites = self
                .shelf_community_tier(user_id, now, &composer, CommunitySource::all_time_favorites())
                .await
                .map(|items| community_items(items, "community favorite", "community favorites"));
            composer.extend_result("community_all_time", favorites);
        }

        if !composer.is_full() {
            let trending = self
                .shelf_catalog_tier(user_id, now, &composer, TrendingFeed::Trending)
                .await
                .map(|shows| catalog_items(shows, "Trending now"));
            composer.extend_result("trending", trending);
        }

        self.finish_shelf(ShelfKind::TrendingThisWeek, user_id, composer).await
    }

    /// All-time high-enjoyment recommends, then the external top-rated list
    #[instrument(skip(self))]
    pub async fn get_community_favorites(&self, user_id: UserId) -> Vec<ShelfItem> {
        let now = self.now();
        let mut composer = FallbackComposer::new(self.config().shelf_target);

        let favorites = self
            .shelf_community_tier(user_id, now, &composer, CommunitySource::all_time_favorites())
            .await
            .map(|items| community_items(items, "community favorite", "community favorites"));
        composer.extend_result("community_all_time", favorites);

        if !composer.is_full() {
            let top_rated = self
                .shelf_catalog_tier(user_id, now, &composer, TrendingFeed::TopRated)
                .await
                .map(|shows| catalog_items(shows, "Top rated"));
            composer.extend_result("top_rated", top_rated);
        }

        self.finish_shelf(ShelfKind::CommunityFavorites, user_id, composer).await
    }

    /// Community recommend stats for one show
    pub async fn recommend_stats(&self, show_id: ShowId) -> Result<RecommendStats> {
        let ratings = self
            .collaborators()
            .ratings
            .fetch_ratings(&RatingFilter::all().for_show(show_id))
            .await
            .with_context(|| format!("Failed to fetch ratings for show {}", show_id))?;
        Ok(compute_recommend_stats(&ratings))
    }

    async fn social_tier(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(Candidate, Show)>> {
        let followees = self
            .collaborators()
            .follows
            .fetch_follows(user_id)
            .await
            .context("Failed to fetch follows")?;
        if followees.is_empty() {
            return Ok(Vec::new());
        }

        let social = SocialSource::new();
        let filter = RatingFilter::all()
            .by_raters(followees.iter().copied())
            .since(social.window_start(now));
        let ratings = self
            .collaborators()
            .ratings
            .fetch_ratings(&filter)
            .await
            .context("Failed to fetch followee ratings")?;

        let mut context =
            self.tier_context(user_id, ViewingMode::default(), now, &HashSet::new(), &HashSet::new());
        context.followees = followees.into_iter().collect();

        let candidates = social.get_candidates(&context, &ratings, limit);
        self.resolve_candidates(candidates).await
    }

    async fn shelf_community_tier(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        composer: &FallbackComposer<ShelfItem>,
        source: CommunitySource,
    ) -> Result<Vec<(Candidate, Show)>> {
        let context = self.tier_context(
            user_id,
            ViewingMode::default(),
            now,
            &HashSet::new(),
            composer.seen(),
        );
        self.community_tier(&context, &source, composer.remaining())
            .await
    }

    async fn shelf_catalog_tier(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        composer: &FallbackComposer<ShelfItem>,
        feed: TrendingFeed,
    ) -> Result<Vec<Show>> {
        let context = self.tier_context(
            user_id,
            ViewingMode::default(),
            now,
            &HashSet::new(),
            composer.seen(),
        );
        Ok(self
            .trending()
            .get_shows(&context, feed, composer.remaining())
            .await?)
    }

    /// Attach stats to every item; each lookup fails on its own
    async fn finish_shelf(
        &self,
        kind: ShelfKind,
        user_id: UserId,
        composer: FallbackComposer<ShelfItem>,
    ) -> Vec<ShelfItem> {
        let mut items = composer.finish();

        let lookups = items.iter().map(|item| self.recommend_stats(item.show_id));
        let stats = join_all(lookups).await;

        for (item, result) in items.iter_mut().zip(stats) {
            match result {
                Ok(stats) => item.stats = Some(stats),
                Err(e) => warn!("No stats for show {}: {:#}", item.show_id, e),
            }
        }

        info!("Shelf {} for user {}: {} items", kind, user_id, items.len());
        items
    }
}
