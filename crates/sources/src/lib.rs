//! # Sources Crate
//!
//! Candidate generation for show recommendations, plus the seams to the
//! collaborators that supply the raw rows.
//!
//! ## Components
//!
//! ### Collaborators
//! Async traits for the ratings, follows, profiles, catalog cache and
//! watch-action readers and the external trending catalog. `MemoryStore`
//! implements all of the backend tables over a `DataIndex`.
//!
//! ### Personal Source
//! Every show other users rated that the requesting user hasn't, with one
//! contribution per rater weighted by taste similarity.
//!
//! ### Social Source
//! Shows the user's followees rated in the last week.
//!
//! ### Community Source
//! Popularity across all users: recent positive recommends, or all-time
//! high-enjoyment recommends.
//!
//! ### Trending Source
//! External trending/top-rated lists, poster-only, written through to the
//! local catalog cache.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{PersonalSource, user_context::{build_exclusion_set, build_user_context}};
//!
//! let exclude = build_exclusion_set(&own, &actions, now, window, &explicit);
//! let context = build_user_context(user_id, mode, now, &own, &followees, &exclude);
//!
//! let personal = PersonalSource::new(corpus);
//! let candidates = personal.get_candidates(&context, &usernames);
//! ```

pub mod collaborators;
pub mod community;
pub mod memory;
pub mod personal;
pub mod similarity;
pub mod social;
pub mod trending;
pub mod types;
pub mod user_context;

pub use collaborators::{
    CatalogStore, CatalogStub, Collaborators, FollowsReader, ProfilesReader, RatingFilter,
    RatingsReader, SourceError, SourceResult, TrendingCatalog, WatchActionReader,
};
pub use community::CommunitySource;
pub use memory::{MemoryStore, MemoryTrendingCatalog};
pub use personal::PersonalSource;
pub use similarity::{calculate_similarity, DEFAULT_SIMILARITY, MIN_SHARED_SHOWS};
pub use social::SocialSource;
pub use trending::{TrendingFeed, TrendingSource};
pub use types::{Candidate, CandidateMetadata, CandidateSource, Contribution, UserContext};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use data_loader::ViewingMode;

    #[test]
    fn test_candidate_creation() {
        let candidate = Candidate::new(1, CandidateSource::Community, 5.0);
        assert_eq!(candidate.show_id, 1);
        assert_eq!(candidate.source, CandidateSource::Community);
        assert_eq!(candidate.base_score, 5.0);
        assert!(candidate.contributions.is_empty());
        assert_eq!(candidate.distinct_raters(), 0);
    }

    #[test]
    fn test_taste_profile_gate() {
        let mut context = UserContext::new(1, ViewingMode::Immediate, Utc::now());
        context.rated_shows.insert(1, 7.0);
        context.rated_shows.insert(2, 7.0);
        assert!(!context.has_taste_profile());

        context.rated_shows.insert(3, 7.0);
        assert!(context.has_taste_profile());
    }
}
