//! Social Source - what the people you follow rated lately
//!
//! Shows are ranked by how many distinct followees rated them inside the
//! window, then by the most recent of those ratings, then by show id.

use crate::types::{Candidate, CandidateSource, UserContext};
use chrono::{DateTime, Duration, Utc};
use data_loader::{Rating, ShowId, UserId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// Default look-back for followee activity
pub const FRIENDS_WINDOW_DAYS: i64 = 7;

pub struct SocialSource {
    window: Duration,
}

impl Default for SocialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SocialSource {
    pub fn new() -> Self {
        Self {
            window: Duration::days(FRIENDS_WINDOW_DAYS),
        }
    }

    /// Configure the look-back window (default: 7 days)
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Earliest rating time that still counts
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    /// Rank followee ratings into candidates.
    ///
    /// `ratings` may contain anything; only followee ratings inside the
    /// window on eligible shows are counted.
    #[instrument(skip(self, context, ratings), fields(user_id = context.user_id))]
    pub fn get_candidates(
        &self,
        context: &UserContext,
        ratings: &[Rating],
        limit: usize,
    ) -> Vec<Candidate> {
        let since = self.window_start(context.now);

        let mut per_show: HashMap<ShowId, (HashSet<UserId>, DateTime<Utc>)> = HashMap::new();
        for rating in ratings {
            if !context.followees.contains(&rating.user_id)
                || rating.created_at < since
                || context.is_ineligible(rating.show_id)
            {
                continue;
            }
            let entry = per_show
                .entry(rating.show_id)
                .or_insert_with(|| (HashSet::new(), rating.created_at));
            entry.0.insert(rating.user_id);
            entry.1 = entry.1.max(rating.created_at);
        }

        let mut candidates: Vec<Candidate> = per_show
            .into_iter()
            .map(|(show_id, (followees, latest_at))| {
                let mut candidate =
                    Candidate::new(show_id, CandidateSource::Social, followees.len() as f32);
                candidate.metadata.rater_count = followees.len() as u32;
                candidate.metadata.latest_at = Some(latest_at);
                candidate
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.base_score
                .partial_cmp(&a.base_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.metadata.latest_at.cmp(&a.metadata.latest_at))
                .then_with(|| a.show_id.cmp(&b.show_id))
        });
        candidates.truncate(limit);

        debug!("Generated {} social candidates", candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use data_loader::ViewingMode;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    fn context() -> UserContext {
        let mut context = UserContext::new(1, ViewingMode::Immediate, now());
        context.followees = [2, 3, 4].into_iter().collect();
        context.rated_shows.insert(50, 7.0);
        context
    }

    #[test]
    fn test_ranks_by_followee_count_then_recency() {
        let ratings = vec![
            Rating::new(2, 10, 8.0, days_ago(1)),
            Rating::new(3, 10, 6.0, days_ago(2)),
            Rating::new(2, 20, 9.0, days_ago(3)),
            Rating::new(4, 30, 9.0, days_ago(1)),
            Rating::new(3, 30, 9.0, days_ago(6)),
            Rating::new(4, 40, 9.0, days_ago(5)),
        ];

        let candidates = SocialSource::new().get_candidates(&context(), &ratings, 10);
        let ids: Vec<ShowId> = candidates.iter().map(|c| c.show_id).collect();

        // 10 and 30 tie on followees and newest rating, so id decides.
        // 20 (3 days) is newer than 40 (5 days).
        assert_eq!(ids, vec![10, 30, 20, 40]);
        assert_eq!(candidates[0].metadata.rater_count, 2);
    }

    #[test]
    fn test_ignores_strangers_old_ratings_and_rated_shows() {
        let ratings = vec![
            Rating::new(9, 10, 8.0, days_ago(1)),
            Rating::new(2, 11, 8.0, days_ago(8)),
            Rating::new(2, 50, 8.0, days_ago(1)),
            Rating::new(2, 12, 8.0, days_ago(7)),
        ];

        let candidates = SocialSource::new().get_candidates(&context(), &ratings, 10);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].show_id, 12);
    }

    #[test]
    fn test_respects_limit_and_window() {
        let ratings = vec![
            Rating::new(2, 10, 8.0, days_ago(1)),
            Rating::new(3, 20, 8.0, days_ago(10)),
        ];

        let source = SocialSource::new().with_window(Duration::days(14));
        assert_eq!(source.get_candidates(&context(), &ratings, 10).len(), 2);
        assert_eq!(source.get_candidates(&context(), &ratings, 1).len(), 1);
    }
}
