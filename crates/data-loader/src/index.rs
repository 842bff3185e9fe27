//! DataIndex building and indexing logic.
//!
//! Loads a fixture directory into a `DataIndex`, computes per-show statistics
//! and validates referential integrity.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::stats::compute_recommend_stats;
use crate::types::*;
use rayon::prelude::*;
use std::path::Path;
use tracing::info;

/// Highest value any score can take
pub const MAX_SCORE: f32 = 10.0;

impl DataIndex {
    /// Load a fixture directory
    ///
    /// Steps:
    /// 1. Parse the five fixture files (profiles/shows/ratings in parallel)
    /// 2. Build primary indices (later rating lines for the same pair win)
    /// 3. Compute show statistics
    /// 4. Validate data integrity
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        info!("Loading fixtures from {:?}", data_dir);

        let profiles_path = data_dir.join("profiles.jsonl");
        let shows_path = data_dir.join("shows.jsonl");
        let ratings_path = data_dir.join("ratings.jsonl");
        let follows_path = data_dir.join("follows.jsonl");
        let actions_path = data_dir.join("watch_actions.jsonl");

        let ((profiles, shows), ratings) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_profiles(&profiles_path),
                    || parser::parse_shows(&shows_path),
                )
            },
            || parser::parse_ratings(&ratings_path),
        );

        let profiles = profiles?;
        let shows = shows?;
        let ratings = ratings?;
        let follows = parser::parse_follows(&follows_path)?;
        let actions = parser::parse_watch_actions(&actions_path)?;

        info!(
            "Parsed {} profiles, {} shows, {} ratings, {} follows, {} watch actions",
            profiles.len(),
            shows.len(),
            ratings.len(),
            follows.len(),
            actions.len()
        );

        let mut index = DataIndex::new();
        for profile in profiles {
            index.insert_profile(profile);
        }
        for show in shows {
            index.upsert_show(show);
        }
        for rating in ratings {
            index.upsert_rating(rating);
        }
        for edge in follows {
            index.insert_follow(edge);
        }
        for action in actions {
            index.insert_watch_action(action);
        }

        index.compute_show_stats();
        index.validate()?;

        info!("DataIndex successfully built and validated");
        Ok(index)
    }

    /// Compute aggregate statistics for every rated show
    pub fn compute_show_stats(&mut self) {
        let show_stats = self
            .show_raters
            .par_iter()
            .map(|(&show_id, _)| {
                let ratings = self.get_show_ratings(show_id);
                let rating_count = ratings.len() as u32;
                let avg_enjoyment = if rating_count > 0 {
                    ratings.iter().map(|r| r.enjoyment).sum::<f32>() / rating_count as f32
                } else {
                    0.0
                };

                (
                    show_id,
                    ShowStats {
                        avg_enjoyment,
                        rating_count,
                        recommend: compute_recommend_stats(ratings),
                    },
                )
            })
            .collect();
        self.show_stats = show_stats;
    }

    /// Validate data integrity
    ///
    /// Check that:
    /// - every rated show exists in the catalog
    /// - every score is within 0-10
    /// - nobody follows themselves
    pub fn validate(&self) -> Result<()> {
        for rating in self.all_ratings() {
            if !self.shows.contains_key(&rating.show_id) {
                return Err(DataLoadError::UnknownShow {
                    user_id: rating.user_id,
                    show_id: rating.show_id,
                });
            }

            let scores = [
                ("enjoyment", Some(rating.enjoyment)),
                ("hook", rating.hook),
                ("consistency", rating.consistency),
                ("payoff", rating.payoff),
                ("heat", rating.heat),
            ];
            for (field, value) in scores {
                if let Some(value) = value {
                    if !(0.0..=MAX_SCORE).contains(&value) {
                        return Err(DataLoadError::ScoreOutOfRange {
                            user_id: rating.user_id,
                            show_id: rating.show_id,
                            field,
                            value,
                        });
                    }
                }
            }
        }

        for (follower, followees) in &self.follows {
            if followees.contains(follower) {
                return Err(DataLoadError::SelfFollow { user_id: *follower });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn show(id: ShowId) -> Show {
        Show {
            id,
            title: format!("Show {}", id),
            poster_path: None,
            first_air_date: None,
        }
    }

    fn at_day(day: u32) -> chrono::DateTime<chrono::Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_show_stats() {
        let mut index = DataIndex::new();
        index.upsert_show(show(1));
        index.upsert_rating(Rating::new(1, 1, 8.0, at_day(1)).with_recommend(true));
        index.upsert_rating(Rating::new(2, 1, 6.0, at_day(2)).with_recommend(false));
        index.upsert_rating(Rating::new(3, 1, 7.0, at_day(3)));
        index.compute_show_stats();

        let stats = index.get_show_stats(1).unwrap();
        assert_eq!(stats.rating_count, 3);
        assert!((stats.avg_enjoyment - 7.0).abs() < 1e-6);
        assert_eq!(stats.recommend.percent, Some(50));
    }

    #[test]
    fn test_validate_rejects_unknown_show() {
        let mut index = DataIndex::new();
        index.upsert_rating(Rating::new(1, 42, 8.0, at_day(1)));
        assert!(matches!(
            index.validate(),
            Err(DataLoadError::UnknownShow { show_id: 42, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_sub_score() {
        let mut index = DataIndex::new();
        index.upsert_show(show(1));
        index.upsert_rating(
            Rating::new(1, 1, 8.0, at_day(1)).with_sub_scores(Some(11.0), None, None, None),
        );
        assert!(matches!(
            index.validate(),
            Err(DataLoadError::ScoreOutOfRange { field: "hook", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_self_follow() {
        let mut index = DataIndex::new();
        index.insert_follow(FollowEdge {
            follower: 7,
            followee: 7,
        });
        assert!(matches!(
            index.validate(),
            Err(DataLoadError::SelfFollow { user_id: 7 })
        ));
    }

    #[test]
    fn test_load_sample_fixtures() {
        // The sample fixtures ship with the repository under data/sample
        let data_dir = Path::new("../../data/sample");

        if data_dir.exists() {
            let index = DataIndex::load_from_files(data_dir).unwrap();
            let (profiles, shows, ratings) = index.counts();
            assert!(profiles > 0);
            assert!(shows > 0);
            assert!(ratings > 0);
        }
    }
}
