//! Filter to ensure a show has enough independent raters.
//!
//! A single opinion is not a signal; shows rated by fewer than the
//! threshold of distinct users (not counting the requesting user) are
//! dropped before scoring.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};
use std::collections::HashSet;

/// Removes candidates with too few distinct raters.
pub struct MinimumRatersFilter {
    min_raters: usize,
}

impl MinimumRatersFilter {
    /// Create a new MinimumRatersFilter (typically `MIN_RATERS_PER_SHOW`).
    pub fn new(min_raters: usize) -> Self {
        Self { min_raters }
    }
}

impl Filter for MinimumRatersFilter {
    fn name(&self) -> &str {
        "MinimumRatersFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>> {
        let filtered: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| {
                let raters: HashSet<_> = candidate
                    .contributions
                    .iter()
                    .map(|c| c.rater_id)
                    .filter(|&rater| rater != context.user_id)
                    .collect();
                raters.len() >= self.min_raters
            })
            .collect();

        Ok(filtered)
    }
}
