//! Seams to the external collaborators the engine reads from.
//!
//! Each backend table (ratings, follows, profiles, catalog cache, watch
//! actions) and the external trending catalog sits behind its own async
//! trait so a hosted backend, the in-memory store and test doubles are
//! interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use data_loader::{Rating, Show, ShowId, UserId, WatchAction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("{collaborator} request failed: {message}")]
    Backend {
        collaborator: &'static str,
        message: String,
    },

    #[error("{collaborator} timed out")]
    Timeout { collaborator: &'static str },

    #[error("store lock poisoned")]
    Poisoned,
}

impl SourceError {
    pub fn backend(collaborator: &'static str, message: impl Into<String>) -> Self {
        SourceError::Backend {
            collaborator,
            message: message.into(),
        }
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Query for the ratings reader. Unset fields don't constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingFilter {
    pub user_id: Option<UserId>,
    pub show_id: Option<ShowId>,
    pub raters: Option<Vec<UserId>>,
    pub since: Option<DateTime<Utc>>,
}

impl RatingFilter {
    /// Matches every rating
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn for_show(mut self, show_id: ShowId) -> Self {
        self.show_id = Some(show_id);
        self
    }

    pub fn by_raters(mut self, raters: impl IntoIterator<Item = UserId>) -> Self {
        self.raters = Some(raters.into_iter().collect());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn matches(&self, rating: &Rating) -> bool {
        self.user_id.is_none_or(|id| rating.user_id == id)
            && self.show_id.is_none_or(|id| rating.show_id == id)
            && self
                .raters
                .as_ref()
                .is_none_or(|raters| raters.contains(&rating.user_id))
            && self.since.is_none_or(|since| rating.created_at >= since)
    }
}

/// Entry from the external trending/top-rated catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStub {
    pub id: ShowId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
}

impl CatalogStub {
    pub fn has_poster(&self) -> bool {
        self.poster_path
            .as_deref()
            .is_some_and(|path| !path.trim().is_empty())
    }

    pub fn into_show(self) -> Show {
        Show {
            id: self.id,
            title: self.title,
            poster_path: self.poster_path,
            first_air_date: self.first_air_date,
        }
    }
}

#[async_trait]
pub trait RatingsReader: Send + Sync {
    async fn fetch_ratings(&self, filter: &RatingFilter) -> SourceResult<Vec<Rating>>;
}

#[async_trait]
pub trait FollowsReader: Send + Sync {
    /// Users that `follower` follows
    async fn fetch_follows(&self, follower: UserId) -> SourceResult<Vec<UserId>>;
}

#[async_trait]
pub trait ProfilesReader: Send + Sync {
    /// `Ok(None)` when the user has no profile row
    async fn fetch_username(&self, user_id: UserId) -> SourceResult<Option<String>>;
}

/// Local catalog cache
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn fetch_show(&self, show_id: ShowId) -> SourceResult<Option<Show>>;
    async fn upsert_show(&self, show: Show) -> SourceResult<()>;
}

#[async_trait]
pub trait WatchActionReader: Send + Sync {
    async fn fetch_watch_actions(&self, user_id: UserId) -> SourceResult<Vec<WatchAction>>;
}

/// External trending/top-rated catalog
#[async_trait]
pub trait TrendingCatalog: Send + Sync {
    async fn fetch_trending(&self, limit: usize) -> SourceResult<Vec<CatalogStub>>;
    async fn fetch_top_rated(&self, limit: usize) -> SourceResult<Vec<CatalogStub>>;
}

/// Every collaborator the orchestrator needs, behind shared trait objects
#[derive(Clone)]
pub struct Collaborators {
    pub ratings: Arc<dyn RatingsReader>,
    pub follows: Arc<dyn FollowsReader>,
    pub profiles: Arc<dyn ProfilesReader>,
    pub catalog: Arc<dyn CatalogStore>,
    pub watch_actions: Arc<dyn WatchActionReader>,
    pub trending: Arc<dyn TrendingCatalog>,
}

impl Collaborators {
    /// Back every table with one store and pair it with an external catalog
    pub fn from_store<S>(store: Arc<S>, trending: Arc<dyn TrendingCatalog>) -> Self
    where
        S: RatingsReader + FollowsReader + ProfilesReader + CatalogStore + WatchActionReader + 'static,
    {
        Self {
            ratings: store.clone(),
            follows: store.clone(),
            profiles: store.clone(),
            catalog: store.clone(),
            watch_actions: store,
            trending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rating_filter_matches() {
        let created = Utc.with_ymd_and_hms(2026, 10, 10, 0, 0, 0).unwrap();
        let rating = Rating::new(3, 30, 7.0, created);

        assert!(RatingFilter::all().matches(&rating));
        assert!(RatingFilter::all().by_user(3).for_show(30).matches(&rating));
        assert!(!RatingFilter::all().by_user(4).matches(&rating));
        assert!(RatingFilter::all().by_raters([1, 3]).matches(&rating));
        assert!(!RatingFilter::all().by_raters(Vec::new()).matches(&rating));
        assert!(RatingFilter::all().since(created).matches(&rating));
        assert!(
            !RatingFilter::all()
                .since(created + chrono::Duration::seconds(1))
                .matches(&rating)
        );
    }

    #[test]
    fn test_stub_poster_detection() {
        let mut stub = CatalogStub {
            id: 1,
            title: "The Bear".to_string(),
            poster_path: Some("/bear.jpg".to_string()),
            first_air_date: Some("2022-06-23".to_string()),
        };
        assert!(stub.has_poster());
        stub.poster_path = Some(String::new());
        assert!(!stub.has_poster());
        stub.poster_path = None;
        assert!(!stub.has_poster());
    }
}
