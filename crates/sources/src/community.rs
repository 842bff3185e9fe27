//! Community Source - popularity across every user
//!
//! Two signals:
//! - recent recommends: ratings with a positive recommend flag inside a
//!   look-back window (7 days by default)
//! - all-time favorites: ratings with enjoyment >= 8 and a positive
//!   recommend flag, no window
//!
//! Shows are ranked by count, highest first; equal counts go by show id.

use crate::types::{Candidate, CandidateSource, UserContext};
use chrono::{DateTime, Duration, Utc};
use data_loader::{Rating, ShowId};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Default look-back for the recent-recommends signal
pub const COMMUNITY_WINDOW_DAYS: i64 = 7;

/// Enjoyment a rating needs to count as an all-time favorite
pub const FAVORITE_MIN_ENJOYMENT: f32 = 8.0;

#[derive(Debug, Clone)]
pub struct CommunitySource {
    /// Only ratings newer than `now - window` count
    window: Option<Duration>,
    min_enjoyment: Option<f32>,
}

impl CommunitySource {
    /// Positive recommends in the last `COMMUNITY_WINDOW_DAYS` days
    pub fn recent_recommends() -> Self {
        Self {
            window: Some(Duration::days(COMMUNITY_WINDOW_DAYS)),
            min_enjoyment: None,
        }
    }

    /// High-enjoyment positive recommends of all time
    pub fn all_time_favorites() -> Self {
        Self {
            window: None,
            min_enjoyment: Some(FAVORITE_MIN_ENJOYMENT),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Earliest rating time that counts, if the signal is windowed
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window.map(|window| now - window)
    }

    /// Whether a rating counts toward its show's popularity
    pub fn counts(&self, rating: &Rating, context: &UserContext) -> bool {
        rating.recommend == Some(true)
            && self
                .window
                .is_none_or(|window| rating.created_at >= context.now - window)
            && self.min_enjoyment.is_none_or(|min| rating.enjoyment >= min)
    }

    #[instrument(skip(self, context, ratings), fields(user_id = context.user_id))]
    pub fn get_candidates(
        &self,
        context: &UserContext,
        ratings: &[Rating],
        limit: usize,
    ) -> Vec<Candidate> {
        let mut counts: HashMap<ShowId, u32> = HashMap::new();
        for rating in ratings {
            if self.counts(rating, context) && !context.is_ineligible(rating.show_id) {
                *counts.entry(rating.show_id).or_insert(0) += 1;
            }
        }

        let mut candidates: Vec<Candidate> = counts
            .into_iter()
            .map(|(show_id, count)| {
                let mut candidate =
                    Candidate::new(show_id, CandidateSource::Community, count as f32);
                candidate.metadata.positive_count = count;
                candidate
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.base_score
                .partial_cmp(&a.base_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.show_id.cmp(&b.show_id))
        });
        candidates.truncate(limit);

        debug!("Generated {} community candidates", candidates.len());
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

    fn recommend(user_id: u32, show_id: ShowId, enjoyment: f32, days_ago: i64) -> Rating {
        Rating::new(user_id, show_id, enjoyment, now() - Duration::days(days_ago))
            .with_recommend(true)
    }

    fn context() -> UserContext {
        UserContext::new(1, ViewingMode::Immediate, now())
    }

    #[test]
    fn test_more_recommends_rank_higher() {
        let mut ratings: Vec<Rating> = (10..15).map(|u| recommend(u, 100, 7.0, 1)).collect();
        ratings.extend((20..22).map(|u| recommend(u, 200, 9.0, 2)));

        let candidates = CommunitySource::recent_recommends().get_candidates(&context(), &ratings, 3);
        let ids: Vec<ShowId> = candidates.iter().map(|c| c.show_id).collect();
        assert_eq!(ids, vec![100, 200]);
        assert_eq!(candidates[0].base_score, 5.0);
        assert_eq!(candidates[1].base_score, 2.0);
    }

    #[test]
    fn test_recent_window_and_flags() {
        let ratings = vec![
            recommend(2, 1, 9.0, 8),
            Rating::new(3, 2, 9.0, now()).with_recommend(false),
            Rating::new(4, 3, 9.0, now()),
            recommend(5, 4, 3.0, 0),
        ];

        let candidates =
            CommunitySource::recent_recommends().get_candidates(&context(), &ratings, 10);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].show_id, 4);
    }

    #[test]
    fn test_window_start() {
        assert_eq!(
            CommunitySource::recent_recommends().window_start(now()),
            Some(now() - Duration::days(7))
        );
        assert_eq!(CommunitySource::all_time_favorites().window_start(now()), None);
    }

    #[test]
    fn test_all_time_favorites() {
        let ratings = vec![
            recommend(2, 1, 8.0, 900),
            recommend(3, 1, 9.5, 400),
            recommend(4, 2, 7.9, 1),
            recommend(5, 3, 10.0, 1),
        ];

        let candidates =
            CommunitySource::all_time_favorites().get_candidates(&context(), &ratings, 10);
        let ids: Vec<ShowId> = candidates.iter().map(|c| c.show_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_ties_break_by_show_id_and_skip_ineligible() {
        let mut context = context();
        context.excluded_shows.insert(5);
        let ratings = vec![
            recommend(2, 9, 8.0, 1),
            recommend(2, 7, 8.0, 1),
            recommend(2, 5, 8.0, 1),
            recommend(3, 5, 8.0, 1),
        ];

        let candidates = CommunitySource::recent_recommends().get_candidates(&context, &ratings, 10);
        let ids: Vec<ShowId> = candidates.iter().map(|c| c.show_id).collect();
        assert_eq!(ids, vec![7, 9]);
    }
}
