//! Helpers to build a UserContext and the exclusion set from fetched rows.
//!
//! The orchestrator fetches the user's ratings, followees and watch actions
//! once; everything here is pure so it can be tested without a store.

use crate::types::UserContext;
use chrono::{DateTime, Duration, Utc};
use data_loader::{Rating, ShowId, UserId, ViewingMode, WatchAction, WatchActionKind};
use std::collections::HashSet;

/// Ratings a user needs before personalized scoring runs at all
pub const MIN_PROFILE_RATINGS: usize = 3;

/// How long a dismissal keeps a show out of the deck
pub const DISMISS_WINDOW_DAYS: i64 = 30;

/// Build a UserContext for one request
///
/// `exclude` is the full exclusion set (see [`build_exclusion_set`]); the
/// user's own ratings are tracked separately in `rated_shows`.
pub fn build_user_context(
    user_id: UserId,
    mode: ViewingMode,
    now: DateTime<Utc>,
    own_ratings: &[Rating],
    followees: &[UserId],
    exclude: &HashSet<ShowId>,
) -> UserContext {
    let mut context = UserContext::new(user_id, mode, now);

    for rating in own_ratings.iter().filter(|r| r.user_id == user_id) {
        context.rated_shows.insert(rating.show_id, rating.enjoyment);
    }

    context.followees = followees
        .iter()
        .copied()
        .filter(|&followee| followee != user_id)
        .collect();
    context.excluded_shows = exclude.clone();

    context
}

/// Shows that must never reach the user's deck
///
/// Union of:
/// - shows the user already rated
/// - shows ever marked `watched` or `not_for_me`
/// - shows `dismissed` within `dismiss_window`
/// - the caller's explicit exclusions
///
/// `saved` shows stay eligible.
pub fn build_exclusion_set(
    own_ratings: &[Rating],
    actions: &[WatchAction],
    now: DateTime<Utc>,
    dismiss_window: Duration,
    explicit: &HashSet<ShowId>,
) -> HashSet<ShowId> {
    let dismissed_after = now - dismiss_window;

    let mut excluded: HashSet<ShowId> = explicit.clone();
    excluded.extend(own_ratings.iter().map(|r| r.show_id));

    for action in actions {
        let excludes = match action.kind {
            WatchActionKind::Watched | WatchActionKind::NotForMe => true,
            WatchActionKind::Dismissed => action.created_at >= dismissed_after,
            WatchActionKind::Saved => false,
        };
        if excludes {
            excluded.insert(action.show_id);
        }
    }

    excluded
}
