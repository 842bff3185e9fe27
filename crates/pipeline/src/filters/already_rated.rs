//! Filter to remove shows the user has already rated.
//!
//! This is typically the first filter in the pipeline, as there's no
//! point in recommending shows the user has already seen.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};

/// Removes candidates that the user has already rated.
pub struct AlreadyRatedFilter;

impl Filter for AlreadyRatedFilter {
    fn name(&self) -> &str {
        "AlreadyRatedFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>> {
        let filtered: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| !context.rated_shows.contains_key(&candidate.show_id))
            .collect();
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use data_loader::ViewingMode;
    use sources::CandidateSource;

    #[test]
    fn test_already_rated_filter() {
        let mut context = UserContext::new(1, ViewingMode::Planned, Utc::now());
        context.rated_shows.insert(100, 8.0);
        context.rated_shows.insert(200, 2.0);

        let candidates = vec![
            Candidate::new(100, CandidateSource::Personal, 0.9),
            Candidate::new(101, CandidateSource::Personal, 0.8),
            Candidate::new(200, CandidateSource::Community, 0.7),
            Candidate::new(300, CandidateSource::Trending, 0.6),
        ];

        let filtered = AlreadyRatedFilter.apply(candidates, &context).unwrap();

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].show_id, 101);
        assert_eq!(filtered[1].show_id, 300);
    }
}
