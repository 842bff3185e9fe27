//! The FilterPipeline chains filters in order.

use crate::filters::{AlreadyRatedFilter, ExcludedShowsFilter, MinimumRatersFilter};
use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(AlreadyRatedFilter)
///     .add_filter(ExcludedShowsFilter)
///     .add_filter(MinimumRatersFilter::new(MIN_RATERS_PER_SHOW));
///
/// let filtered = pipeline.apply(candidates, &context)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    /// Create a new empty FilterPipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// The filters every personal recommendation run goes through
    pub fn personal(min_raters: usize) -> Self {
        Self::new()
            .add_filter(AlreadyRatedFilter)
            .add_filter(ExcludedShowsFilter)
            .add_filter(MinimumRatersFilter::new(min_raters))
    }

    /// Add a filter to the pipeline (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run the filters in order. Stops early once the pool is empty.
    pub fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>> {
        let mut pool = candidates;
        for filter in &self.filters {
            if pool.is_empty() {
                break;
            }
            let before = pool.len();
            pool = filter.apply(pool, context)?;
            tracing::debug!(
                filter = filter.name(),
                user_id = context.user_id,
                "{} -> {} candidates",
                before,
                pool.len()
            );
        }
        Ok(pool)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}
