//! In-memory collaborators backed by a `DataIndex`.
//!
//! Used by the CLI against fixture directories and by tests. Writes (catalog
//! upserts from the trending tier) go through a `RwLock`, reads take a
//! snapshot under the read lock and return owned values.

use async_trait::async_trait;
use data_loader::{DataIndex, Rating, Show, ShowId, UserId, WatchAction};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::collaborators::*;

/// One store serving every backend table
#[derive(Debug, Default)]
pub struct MemoryStore {
    index: RwLock<DataIndex>,
}

impl MemoryStore {
    pub fn new(index: DataIndex) -> Self {
        Self {
            index: RwLock::new(index),
        }
    }

    fn read(&self) -> SourceResult<RwLockReadGuard<'_, DataIndex>> {
        self.index.read().map_err(|_| SourceError::Poisoned)
    }

    fn write(&self) -> SourceResult<RwLockWriteGuard<'_, DataIndex>> {
        self.index.write().map_err(|_| SourceError::Poisoned)
    }

    /// Run `f` against the current snapshot
    pub fn with_index<T>(&self, f: impl FnOnce(&DataIndex) -> T) -> SourceResult<T> {
        let index = self.read()?;
        Ok(f(&index))
    }
}

#[async_trait]
impl RatingsReader for MemoryStore {
    async fn fetch_ratings(&self, filter: &RatingFilter) -> SourceResult<Vec<Rating>> {
        let index = self.read()?;

        let mut ratings: Vec<Rating> = match (filter.user_id, filter.show_id) {
            (Some(user_id), _) => index
                .get_user_ratings(user_id)
                .into_iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
            (None, Some(show_id)) => index
                .get_show_ratings(show_id)
                .into_iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
            (None, None) => index
                .all_ratings()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
        };

        ratings.sort_by_key(|r| (r.user_id, r.show_id));
        debug!("Fetched {} ratings for {:?}", ratings.len(), filter);
        Ok(ratings)
    }
}

#[async_trait]
impl FollowsReader for MemoryStore {
    async fn fetch_follows(&self, follower: UserId) -> SourceResult<Vec<UserId>> {
        Ok(self.read()?.get_followees(follower))
    }
}

#[async_trait]
impl ProfilesReader for MemoryStore {
    async fn fetch_username(&self, user_id: UserId) -> SourceResult<Option<String>> {
        Ok(self
            .read()?
            .get_profile(user_id)
            .map(|profile| profile.username.clone()))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn fetch_show(&self, show_id: ShowId) -> SourceResult<Option<Show>> {
        Ok(self.read()?.get_show(show_id).cloned())
    }

    async fn upsert_show(&self, show: Show) -> SourceResult<()> {
        self.write()?.upsert_show(show);
        Ok(())
    }
}

#[async_trait]
impl WatchActionReader for MemoryStore {
    async fn fetch_watch_actions(&self, user_id: UserId) -> SourceResult<Vec<WatchAction>> {
        Ok(self.read()?.get_watch_actions(user_id).to_vec())
    }
}

/// Fixed trending and top-rated lists standing in for the external catalog
#[derive(Debug, Clone, Default)]
pub struct MemoryTrendingCatalog {
    trending: Vec<CatalogStub>,
    top_rated: Vec<CatalogStub>,
}

impl MemoryTrendingCatalog {
    pub fn new(trending: Vec<CatalogStub>, top_rated: Vec<CatalogStub>) -> Self {
        Self {
            trending,
            top_rated,
        }
    }

    /// Load `trending.jsonl` and `top_rated.jsonl` from a fixture directory.
    ///
    /// Either file may be absent.
    pub fn load_from_dir(data_dir: &Path) -> data_loader::Result<Self> {
        let load = |name: &str| -> data_loader::Result<Vec<CatalogStub>> {
            let path = data_dir.join(name);
            if path.exists() {
                data_loader::parser::parse_json_lines(&path)
            } else {
                Ok(Vec::new())
            }
        };
        Ok(Self::new(load("trending.jsonl")?, load("top_rated.jsonl")?))
    }
}

#[async_trait]
impl TrendingCatalog for MemoryTrendingCatalog {
    async fn fetch_trending(&self, limit: usize) -> SourceResult<Vec<CatalogStub>> {
        Ok(self.trending.iter().take(limit).cloned().collect())
    }

    async fn fetch_top_rated(&self, limit: usize) -> SourceResult<Vec<CatalogStub>> {
        Ok(self.top_rated.iter().take(limit).cloned().collect())
    }
}
