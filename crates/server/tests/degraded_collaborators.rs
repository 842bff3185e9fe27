//! Behaviour when collaborators fail.
//!
//! The personal pipeline surfaces read failures; the home deck and shelves
//! degrade tier by tier instead.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use mockall::mock;

use data_loader::{DataIndex, Rating, Show, ShowId, ViewingMode};
use server::{EngineConfig, RecommendationOrchestrator, ShelfKind};
use sources::{
    CatalogStore, CatalogStub, Collaborators, MemoryStore, MemoryTrendingCatalog, RatingFilter,
    RatingsReader, SourceError, SourceResult, TrendingCatalog,
};

mock! {
    pub Ratings {}

    #[async_trait]
    impl RatingsReader for Ratings {
        async fn fetch_ratings(&self, filter: &RatingFilter) -> SourceResult<Vec<Rating>>;
    }
}

mock! {
    pub Trending {}

    #[async_trait]
    impl TrendingCatalog for Trending {
        async fn fetch_trending(&self, limit: usize) -> SourceResult<Vec<CatalogStub>>;
        async fn fetch_top_rated(&self, limit: usize) -> SourceResult<Vec<CatalogStub>>;
    }
}

mock! {
    pub Catalog {}

    #[async_trait]
    impl CatalogStore for Catalog {
        async fn fetch_show(&self, show_id: ShowId) -> SourceResult<Option<Show>>;
        async fn upsert_show(&self, show: Show) -> SourceResult<()>;
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

fn show(id: ShowId) -> Show {
    Show {
        id,
        title: format!("Show {}", id),
        poster_path: Some(format!("/{}.jpg", id)),
        first_air_date: None,
    }
}

fn stub(id: ShowId) -> CatalogStub {
    CatalogStub {
        id,
        title: format!("Trending {}", id),
        poster_path: Some(format!("/t{}.jpg", id)),
        first_air_date: None,
    }
}

/// Users 10-12 recommend show 1 this week; user 13 loved show 2 last year
fn corpus() -> Vec<Rating> {
    let mut ratings: Vec<Rating> = (10..13)
        .map(|user_id| Rating::new(user_id, 1, 7.5, now() - Duration::days(1)).with_recommend(true))
        .collect();
    ratings.push(Rating::new(13, 2, 9.0, now() - Duration::days(300)).with_recommend(true));
    ratings.push(Rating::new(14, 2, 6.0, now() - Duration::days(200)).with_recommend(false));
    ratings
}

fn store() -> Arc<MemoryStore> {
    let mut index = DataIndex::new();
    for id in [1, 2] {
        index.upsert_show(show(id));
    }
    for rating in corpus() {
        index.upsert_rating(rating);
    }
    Arc::new(MemoryStore::new(index))
}

fn trending_catalog() -> Arc<MemoryTrendingCatalog> {
    Arc::new(MemoryTrendingCatalog::new(
        vec![stub(50), stub(51), stub(52)],
        vec![stub(60)],
    ))
}

fn orchestrator(collaborators: Collaborators, home_target: usize) -> RecommendationOrchestrator {
    let config = EngineConfig {
        home_target,
        ..EngineConfig::default()
    };
    RecommendationOrchestrator::new(collaborators, config).with_fixed_now(now())
}

fn ids<T, F: Fn(&T) -> ShowId>(items: &[T], id: F) -> Vec<ShowId> {
    items.iter().map(id).collect()
}

#[tokio::test]
async fn test_ratings_outage_fails_personal_but_not_home() {
    let mut ratings = MockRatings::new();
    ratings
        .expect_fetch_ratings()
        .returning(|_| Err(SourceError::backend("ratings", "connection refused")));

    let collaborators = Collaborators {
        ratings: Arc::new(ratings),
        ..Collaborators::from_store(store(), trending_catalog())
    };
    let orchestrator = orchestrator(collaborators, 3);

    let personal = orchestrator
        .get_personalized_recommendations(1, ViewingMode::Immediate, &HashSet::new())
        .await;
    assert!(personal.is_err());

    // Personal and community tiers fail; trending still fills the deck
    let picks = orchestrator
        .get_home_picks(1, ViewingMode::Immediate, &HashSet::new())
        .await;
    assert_eq!(ids(&picks, |p| p.show_id), vec![50, 51, 52]);
}

#[tokio::test]
async fn test_caller_exclusions_survive_an_exclusion_read_failure() {
    let mut ratings = MockRatings::new();
    ratings
        .expect_fetch_ratings()
        .returning(|_| Err(SourceError::Timeout { collaborator: "ratings" }));

    let collaborators = Collaborators {
        ratings: Arc::new(ratings),
        ..Collaborators::from_store(store(), trending_catalog())
    };
    let orchestrator = orchestrator(collaborators, 3);
    let exclude: HashSet<ShowId> = [51].into_iter().collect();

    let picks = orchestrator
        .get_home_picks(1, ViewingMode::Planned, &exclude)
        .await;
    assert_eq!(ids(&picks, |p| p.show_id), vec![50, 52]);
}

#[tokio::test]
async fn test_trending_outage_is_skipped() {
    let mut trending = MockTrending::new();
    trending
        .expect_fetch_trending()
        .returning(|_| Err(SourceError::backend("trending", "503")));
    trending
        .expect_fetch_top_rated()
        .returning(|_| Err(SourceError::backend("trending", "503")));

    let orchestrator = orchestrator(Collaborators::from_store(store(), Arc::new(trending)), 5);

    // New user: no personal tier, community has show 1, trending fails
    let picks = orchestrator
        .get_home_picks(7, ViewingMode::Immediate, &HashSet::new())
        .await;
    assert_eq!(ids(&picks, |p| p.show_id), vec![1]);

    let shelf = orchestrator
        .get_shelf(7, ShelfKind::CommunityFavorites)
        .await;
    assert_eq!(ids(&shelf, |i| i.show_id), vec![2]);
}

#[tokio::test]
async fn test_failed_cache_write_keeps_trending_items() {
    let mut catalog = MockCatalog::new();
    catalog.expect_fetch_show().returning(|_| Ok(None));
    catalog
        .expect_upsert_show()
        .times(3)
        .returning(|_| Err(SourceError::backend("catalog", "read-only replica")));

    let empty = Arc::new(MemoryStore::new(DataIndex::new()));
    let collaborators = Collaborators {
        catalog: Arc::new(catalog),
        ..Collaborators::from_store(empty, trending_catalog())
    };
    let orchestrator = orchestrator(collaborators, 10);

    let picks = orchestrator
        .get_home_picks(1, ViewingMode::Immediate, &HashSet::new())
        .await;
    assert_eq!(ids(&picks, |p| p.show_id), vec![50, 51, 52]);
}

#[tokio::test]
async fn test_stats_failure_leaves_item_without_stats() {
    let corpus = corpus();
    let mut ratings = MockRatings::new();
    ratings.expect_fetch_ratings().returning(move |filter| {
        if filter.show_id == Some(2) {
            return Err(SourceError::backend("ratings", "statement timeout"));
        }
        Ok(corpus.iter().filter(|r| filter.matches(r)).cloned().collect())
    });

    let collaborators = Collaborators {
        ratings: Arc::new(ratings),
        ..Collaborators::from_store(store(), trending_catalog())
    };
    let orchestrator = orchestrator(collaborators, 10);

    let shelf = orchestrator
        .get_shelf(99, ShelfKind::TrendingThisWeek)
        .await;

    // Show 1 this week, show 2 as a favorite, then trending
    assert_eq!(ids(&shelf, |i| i.show_id), vec![1, 2, 50]);
    let stats = shelf[0].stats.expect("stats for show 1");
    assert_eq!((stats.total, stats.percent), (3, Some(100)));
    assert!(shelf[1].stats.is_none());
    assert!(shelf[2].stats.is_some());

    assert!(orchestrator.recommend_stats(2).await.is_err());
}
