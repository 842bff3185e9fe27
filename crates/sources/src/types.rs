//! Candidate and request-context types shared by every source.

use chrono::{DateTime, Utc};
use data_loader::{Rating, ShowId, UserId, ViewingMode};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::user_context::MIN_PROFILE_RATINGS;

/// Which tier produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Similar-user scoring over the whole corpus
    Personal,
    /// Recent ratings by people the user follows
    Social,
    /// Community-wide popularity
    Community,
    /// External trending / top-rated catalog
    Trending,
}

/// One other user's rating of a candidate show, with the weights the
/// aggregator needs already attached.
#[derive(Debug, Clone)]
pub struct Contribution {
    pub rater_id: UserId,
    pub username: String,
    pub enjoyment: f32,
    pub hook: Option<f32>,
    pub consistency: Option<f32>,
    pub payoff: Option<f32>,
    pub recommend: Option<bool>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Similarity between the rater and the requesting user, in [0, 1]
    pub similarity: f32,
    /// Whether the requesting user follows the rater
    pub is_followed: bool,
}

impl Contribution {
    pub fn from_rating(
        rating: &Rating,
        username: impl Into<String>,
        similarity: f32,
        is_followed: bool,
    ) -> Self {
        Self {
            rater_id: rating.user_id,
            username: username.into(),
            enjoyment: rating.enjoyment,
            hook: rating.hook,
            consistency: rating.consistency,
            payoff: rating.payoff,
            recommend: rating.recommend,
            tags: rating.tags.clone(),
            created_at: rating.created_at,
            similarity,
            is_followed,
        }
    }
}

/// Extra signals a source can attach to a candidate
#[derive(Debug, Clone, Default)]
pub struct CandidateMetadata {
    /// Distinct raters behind the candidate
    pub rater_count: u32,
    /// Ratings with a positive recommend flag
    pub positive_count: u32,
    /// Most recent rating that surfaced the candidate
    pub latest_at: Option<DateTime<Utc>>,
}

/// A show that some source thinks the user might want
#[derive(Debug, Clone)]
pub struct Candidate {
    pub show_id: ShowId,
    pub source: CandidateSource,
    /// Source-specific ranking signal (a count for popularity tiers)
    pub base_score: f32,
    /// Per-rater inputs for the score aggregator; empty for non-personal tiers
    pub contributions: Vec<Contribution>,
    pub metadata: CandidateMetadata,
}

impl Candidate {
    pub fn new(show_id: ShowId, source: CandidateSource, base_score: f32) -> Self {
        Self {
            show_id,
            source,
            base_score,
            contributions: Vec::new(),
            metadata: CandidateMetadata::default(),
        }
    }

    /// Number of distinct raters among the contributions
    pub fn distinct_raters(&self) -> usize {
        self.contributions
            .iter()
            .map(|c| c.rater_id)
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Everything known about the requesting user for one request.
///
/// Built once up front so sources and filters never go back to the store.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: UserId,
    pub mode: ViewingMode,
    /// Reference time for recency; injected so scoring stays deterministic
    pub now: DateTime<Utc>,
    /// The user's own enjoyment scores
    pub rated_shows: HashMap<ShowId, f32>,
    pub followees: HashSet<UserId>,
    /// Shows the caller or the watch history ruled out
    pub excluded_shows: HashSet<ShowId>,
}

impl UserContext {
    pub fn new(user_id: UserId, mode: ViewingMode, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            mode,
            now,
            rated_shows: HashMap::new(),
            followees: HashSet::new(),
            excluded_shows: HashSet::new(),
        }
    }

    /// True once the user has rated enough shows for similarity to mean anything
    pub fn has_taste_profile(&self) -> bool {
        self.rated_shows.len() >= MIN_PROFILE_RATINGS
    }

    /// Already rated or explicitly excluded
    pub fn is_ineligible(&self, show_id: ShowId) -> bool {
        self.rated_shows.contains_key(&show_id) || self.excluded_shows.contains(&show_id)
    }
}
