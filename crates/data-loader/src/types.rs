//! Core domain types for the ratings corpus.
//!
//! Everything the scoring engine reads is defined here: ratings with their
//! sub-dimension scores, catalog shows, follow edges, profiles and watch
//! actions, plus the `DataIndex` that holds a snapshot of all of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a show (catalog id, shared by movies and series)
pub type ShowId = u32;

// =============================================================================
// Ratings
// =============================================================================

/// One user's rating of one show.
///
/// All scores share the 0-10 scale. Sub-dimension scores are optional because
/// the rating form lets users skip them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub show_id: ShowId,
    /// Overall enjoyment, 0-10
    pub enjoyment: f32,
    #[serde(default)]
    pub hook: Option<f32>,
    #[serde(default)]
    pub consistency: Option<f32>,
    #[serde(default)]
    pub payoff: Option<f32>,
    #[serde(default)]
    pub heat: Option<f32>,
    /// Tri-state: `None` means the user didn't answer, which is not the same as `Some(false)`
    #[serde(default)]
    pub recommend: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    /// Minimal rating with only the required fields set
    pub fn new(user_id: UserId, show_id: ShowId, enjoyment: f32, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            show_id,
            enjoyment,
            hook: None,
            consistency: None,
            payoff: None,
            heat: None,
            recommend: None,
            tags: Vec::new(),
            created_at,
        }
    }

    pub fn with_recommend(mut self, recommend: bool) -> Self {
        self.recommend = Some(recommend);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sub_scores(
        mut self,
        hook: Option<f32>,
        consistency: Option<f32>,
        payoff: Option<f32>,
        heat: Option<f32>,
    ) -> Self {
        self.hook = hook;
        self.consistency = consistency;
        self.payoff = payoff;
        self.heat = heat;
        self
    }
}

/// Aggregate recommend-rate for a set of ratings.
///
/// `percent` is `None` when no rating answered the recommend question, so
/// "no data" stays distinguishable from "0% recommend".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecommendStats {
    /// Ratings that answered the recommend question
    pub total: u32,
    pub positive: u32,
    pub percent: Option<u8>,
}

// =============================================================================
// Catalog
// =============================================================================

/// Whether a catalog entry is a film or a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Series,
}

/// A catalog entry, cached locally from the external catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Only series carry a premiere date in the upstream catalog
    #[serde(default)]
    pub first_air_date: Option<String>,
}

impl Show {
    pub fn media_kind(&self) -> MediaKind {
        match self.first_air_date.as_deref() {
            Some(date) if !date.trim().is_empty() => MediaKind::Series,
            _ => MediaKind::Movie,
        }
    }

    pub fn has_poster(&self) -> bool {
        self.poster_path
            .as_deref()
            .is_some_and(|path| !path.trim().is_empty())
    }
}

// =============================================================================
// Social graph & profiles
// =============================================================================

/// Directed follow relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower: UserId,
    pub followee: UserId,
}

/// Public profile, used for the `@username` part of explanations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub username: String,
}

// =============================================================================
// Watch actions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchActionKind {
    Saved,
    Watched,
    Dismissed,
    NotForMe,
}

/// Something a user did with a show outside of rating it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchAction {
    pub user_id: UserId,
    pub show_id: ShowId,
    pub kind: WatchActionKind,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Viewing mode
// =============================================================================

/// Viewing context the user is picking for.
///
/// `Immediate` is "something for tonight", `Planned` is "something for the weekend".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewingMode {
    #[default]
    Immediate,
    Planned,
}

impl FromStr for ViewingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" | "tonight" => Ok(ViewingMode::Immediate),
            "planned" | "weekend" => Ok(ViewingMode::Planned),
            other => Err(format!(
                "unknown viewing mode '{}' (expected immediate or planned)",
                other
            )),
        }
    }
}

impl fmt::Display for ViewingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewingMode::Immediate => write!(f, "immediate"),
            ViewingMode::Planned => write!(f, "planned"),
        }
    }
}

// =============================================================================
// Statistics Types
// =============================================================================

/// Precomputed statistics for a show
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShowStats {
    pub avg_enjoyment: f32,
    pub rating_count: u32,
    pub recommend: RecommendStats,
}

// =============================================================================
// DataIndex - in-memory snapshot of the backend tables
// =============================================================================

/// Holds every table the engine reads, indexed for the lookups it performs.
///
/// Ratings are keyed by (user, show) so a second write for the same pair
/// replaces the first one.
#[derive(Debug, Default)]
pub struct DataIndex {
    pub(crate) profiles: HashMap<UserId, Profile>,
    pub(crate) shows: HashMap<ShowId, Show>,

    /// Ratings made by each user, ordered by show id
    pub(crate) user_ratings: HashMap<UserId, BTreeMap<ShowId, Rating>>,
    /// Users who rated each show
    pub(crate) show_raters: HashMap<ShowId, BTreeSet<UserId>>,

    /// Followees of each follower
    pub(crate) follows: HashMap<UserId, BTreeSet<UserId>>,
    pub(crate) watch_actions: HashMap<UserId, Vec<WatchAction>>,

    pub(crate) show_stats: HashMap<ShowId, ShowStats>,
}

impl DataIndex {
    /// Creates a new, empty DataIndex
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_profile(&self, id: UserId) -> Option<&Profile> {
        self.profiles.get(&id)
    }

    pub fn get_show(&self, id: ShowId) -> Option<&Show> {
        self.shows.get(&id)
    }

    pub fn get_rating(&self, user_id: UserId, show_id: ShowId) -> Option<&Rating> {
        self.user_ratings.get(&user_id)?.get(&show_id)
    }

    /// All ratings made by a user, ordered by show id
    pub fn get_user_ratings(&self, user_id: UserId) -> Vec<&Rating> {
        self.user_ratings
            .get(&user_id)
            .map(|ratings| ratings.values().collect())
            .unwrap_or_default()
    }

    /// All ratings of a show, ordered by rater id
    pub fn get_show_ratings(&self, show_id: ShowId) -> Vec<&Rating> {
        self.show_raters
            .get(&show_id)
            .map(|raters| {
                raters
                    .iter()
                    .filter_map(|user_id| self.get_rating(*user_id, show_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every rating in the index
    pub fn all_ratings(&self) -> impl Iterator<Item = &Rating> {
        self.user_ratings.values().flat_map(|ratings| ratings.values())
    }

    /// Followees of `follower`, ascending
    pub fn get_followees(&self, follower: UserId) -> Vec<UserId> {
        self.follows
            .get(&follower)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn get_watch_actions(&self, user_id: UserId) -> &[WatchAction] {
        self.watch_actions
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_show_stats(&self, show_id: ShowId) -> Option<&ShowStats> {
        self.show_stats.get(&show_id)
    }

    pub fn get_all_show_ids(&self) -> Vec<ShowId> {
        let mut ids: Vec<ShowId> = self.shows.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn get_all_user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self
            .profiles
            .keys()
            .chain(self.user_ratings.keys())
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn insert_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.user_id, profile);
    }

    /// Insert or replace a catalog entry
    pub fn upsert_show(&mut self, show: Show) {
        self.shows.insert(show.id, show);
    }

    /// Insert a rating, replacing any earlier rating for the same (user, show)
    ///
    /// Returns the replaced rating, if any.
    pub fn upsert_rating(&mut self, rating: Rating) -> Option<Rating> {
        self.show_raters
            .entry(rating.show_id)
            .or_default()
            .insert(rating.user_id);

        self.user_ratings
            .entry(rating.user_id)
            .or_default()
            .insert(rating.show_id, rating)
    }

    /// Record a follow edge; duplicate edges are ignored
    pub fn insert_follow(&mut self, edge: FollowEdge) {
        self.follows
            .entry(edge.follower)
            .or_default()
            .insert(edge.followee);
    }

    pub fn insert_watch_action(&mut self, action: WatchAction) {
        self.watch_actions
            .entry(action.user_id)
            .or_default()
            .push(action);
    }

    /// (profiles, shows, ratings) counts for debugging/validation
    pub fn counts(&self) -> (usize, usize, usize) {
        let total_ratings = self.user_ratings.values().map(|v| v.len()).sum();
        (self.profiles.len(), self.shows.len(), total_ratings)
    }
}
