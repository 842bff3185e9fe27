//! Community recommend-rate statistic.

use crate::types::{Rating, RecommendStats};

/// Compute the recommend-rate over a set of ratings.
///
/// Ratings that didn't answer the recommend question are ignored entirely:
/// `total` counts the answers, and `percent` is `None` when there are none.
pub fn compute_recommend_stats<'a, I>(ratings: I) -> RecommendStats
where
    I: IntoIterator<Item = &'a Rating>,
{
    recommend_stats_from_flags(ratings.into_iter().map(|r| r.recommend))
}

/// Same as [`compute_recommend_stats`], over bare recommend flags
pub fn recommend_stats_from_flags<I>(flags: I) -> RecommendStats
where
    I: IntoIterator<Item = Option<bool>>,
{
    let mut total = 0u32;
    let mut positive = 0u32;

    for recommended in flags.into_iter().flatten() {
        total += 1;
        if recommended {
            positive += 1;
        }
    }

    let percent = if total == 0 {
        None
    } else {
        Some((100.0 * positive as f64 / total as f64).round() as u8)
    };

    RecommendStats {
        total,
        positive,
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn rating(user_id: u32, recommend: Option<bool>) -> Rating {
        let mut r = Rating::new(
            user_id,
            1,
            7.0,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        );
        r.recommend = recommend;
        r
    }

    #[test]
    fn test_empty_ratings_have_no_percent() {
        let stats = compute_recommend_stats(&Vec::<Rating>::new());
        assert_eq!(
            stats,
            RecommendStats {
                total: 0,
                positive: 0,
                percent: None
            }
        );
    }

    #[test]
    fn test_two_of_three_rounds_to_67() {
        let ratings = vec![
            rating(1, Some(true)),
            rating(2, Some(true)),
            rating(3, Some(false)),
        ];
        let stats = compute_recommend_stats(&ratings);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.positive, 2);
        assert_eq!(stats.percent, Some(67));
    }

    #[test]
    fn test_absent_flags_do_not_count_as_negative() {
        let ratings = vec![rating(1, Some(true)), rating(2, None), rating(3, None)];
        let stats = compute_recommend_stats(&ratings);
        assert_eq!(stats.positive, 1);
        assert_eq!(stats.percent, Some(100));

        let only_valid = vec![rating(1, Some(true))];
        assert_eq!(compute_recommend_stats(&only_valid), stats);
    }

    #[test]
    fn test_stats_depend_only_on_answered_flags() {
        let mixed = vec![
            rating(1, Some(true)),
            rating(2, Some(false)),
            rating(3, None),
            rating(4, None),
        ];
        let answered = vec![rating(1, Some(true)), rating(2, Some(false))];

        let stats = compute_recommend_stats(&mixed);
        assert_eq!(stats, compute_recommend_stats(&answered));
        assert_eq!(
            stats,
            RecommendStats {
                total: 2,
                positive: 1,
                percent: Some(50)
            }
        );
    }

    #[test]
    fn test_no_answers_is_not_zero_percent() {
        let ratings = vec![rating(1, None), rating(2, None)];
        let stats = compute_recommend_stats(&ratings);
        assert_eq!(stats, RecommendStats::default());

        let negative = vec![rating(1, Some(false))];
        assert_eq!(compute_recommend_stats(&negative).percent, Some(0));
    }
}
