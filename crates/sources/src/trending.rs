//! Trending Source - last tier, backed by the external catalog
//!
//! Only entries with a displayable poster are used. Every show returned is
//! written through to the local catalog cache first; a failed upsert is
//! logged and the show is still returned.

use crate::collaborators::{CatalogStore, SourceResult, TrendingCatalog};
use crate::types::UserContext;
use data_loader::{Show, ShowId};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Which external list to pull from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendingFeed {
    Trending,
    TopRated,
}

pub struct TrendingSource {
    catalog: Arc<dyn TrendingCatalog>,
    cache: Arc<dyn CatalogStore>,
    /// Entries requested from the external catalog per call
    fetch_size: usize,
}

impl TrendingSource {
    pub fn new(catalog: Arc<dyn TrendingCatalog>, cache: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog,
            cache,
            fetch_size: 20,
        }
    }

    /// Configure how many entries to request upstream (default: 20)
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    /// Up to `limit` eligible shows with posters, cached locally.
    ///
    /// Errors only when the external catalog itself fails.
    #[instrument(skip(self, context), fields(user_id = context.user_id))]
    pub async fn get_shows(
        &self,
        context: &UserContext,
        feed: TrendingFeed,
        limit: usize,
    ) -> SourceResult<Vec<Show>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let fetch_size = self.fetch_size.max(limit);
        let stubs = match feed {
            TrendingFeed::Trending => self.catalog.fetch_trending(fetch_size).await?,
            TrendingFeed::TopRated => self.catalog.fetch_top_rated(fetch_size).await?,
        };
        let fetched = stubs.len();

        let mut seen: HashSet<ShowId> = HashSet::new();
        let shows: Vec<Show> = stubs
            .into_iter()
            .filter(|stub| stub.has_poster() && !context.is_ineligible(stub.id))
            .filter(|stub| seen.insert(stub.id))
            .take(limit)
            .map(|stub| stub.into_show())
            .collect();

        join_all(shows.iter().map(|show| self.write_through(show))).await;

        debug!(
            "Kept {} of {} {:?} entries",
            shows.len(),
            fetched,
            feed
        );
        Ok(shows)
    }

    async fn write_through(&self, show: &Show) {
        if let Err(e) = self.cache.upsert_show(show.clone()).await {
            warn!("Failed to cache show {} ({}): {}", show.id, show.title, e);
        }
    }
}
