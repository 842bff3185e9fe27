//! Filter to drop shows ruled out by the caller or the watch history.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};

pub struct ExcludedShowsFilter;

impl Filter for ExcludedShowsFilter {
    fn name(&self) -> &str {
        "ExcludedShowsFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| !context.excluded_shows.contains(&candidate.show_id))
            .collect())
    }
}
