//! User-to-user taste similarity.
//!
//! Similarity is one minus the mean absolute enjoyment gap over the shows both
//! users rated, scaled to [0, 1]. Pairs with too little overlap get a fixed
//! middling value so sparse users still contribute a little.

use data_loader::{MAX_SCORE, Rating, ShowId, UserId};
use rayon::prelude::*;
use std::collections::HashMap;

/// Shared shows needed before the enjoyment gap is trusted
pub const MIN_SHARED_SHOWS: usize = 3;

/// Similarity assumed when two users share fewer than `MIN_SHARED_SHOWS` shows
pub const DEFAULT_SIMILARITY: f32 = 0.3;

/// Show -> enjoyment map for one user's ratings
pub fn enjoyment_map<'a, I>(ratings: I) -> HashMap<ShowId, f32>
where
    I: IntoIterator<Item = &'a Rating>,
{
    ratings
        .into_iter()
        .map(|r| (r.show_id, r.enjoyment))
        .collect()
}

/// Similarity of `other` to `current`, in [0, 1].
///
/// The overlap is taken from `current`'s side, so call it once per
/// (current, other) pair.
pub fn calculate_similarity(
    current: &HashMap<ShowId, f32>,
    other: &HashMap<ShowId, f32>,
) -> f32 {
    let diffs: Vec<f32> = current
        .iter()
        .filter_map(|(show_id, mine)| other.get(show_id).map(|theirs| (mine - theirs).abs()))
        .collect();

    if diffs.len() < MIN_SHARED_SHOWS {
        return DEFAULT_SIMILARITY;
    }

    let mean_abs_diff = diffs.iter().sum::<f32>() / diffs.len() as f32;
    (1.0 - mean_abs_diff / MAX_SCORE).clamp(0.0, 1.0)
}

/// Similarity of every user in `others` to `current`, computed in parallel
pub fn similarity_map(
    current: &HashMap<ShowId, f32>,
    others: &[(UserId, &HashMap<ShowId, f32>)],
) -> HashMap<UserId, f32> {
    others
        .par_iter()
        .map(|&(user_id, ratings)| (user_id, calculate_similarity(current, ratings)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(ShowId, f32)]) -> HashMap<ShowId, f32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_sparse_overlap_returns_default() {
        let me = map(&[(1, 9.0), (2, 8.0), (3, 7.0)]);
        assert_eq!(calculate_similarity(&me, &map(&[])), DEFAULT_SIMILARITY);
        assert_eq!(calculate_similarity(&me, &map(&[(1, 9.0)])), DEFAULT_SIMILARITY);
        assert_eq!(
            calculate_similarity(&me, &map(&[(1, 0.0), (2, 0.0), (4, 1.0)])),
            DEFAULT_SIMILARITY
        );
    }

    #[test]
    fn test_identical_ratings_are_fully_similar() {
        let me = map(&[(1, 9.0), (2, 4.0), (3, 7.5), (4, 2.0)]);
        let other = map(&[(1, 9.0), (2, 4.0), (3, 7.5), (9, 1.0)]);
        assert_eq!(calculate_similarity(&me, &other), 1.0);
    }

    #[test]
    fn test_opposite_ratings_are_dissimilar() {
        let me = map(&[(1, 10.0), (2, 0.0), (3, 10.0)]);
        let other = map(&[(1, 0.0), (2, 10.0), (3, 0.0)]);
        assert_eq!(calculate_similarity(&me, &other), 0.0);
    }

    #[test]
    fn test_mean_absolute_difference() {
        // Gaps of 1, 2 and 3 -> mean 2 -> 0.8
        let me = map(&[(1, 8.0), (2, 6.0), (3, 5.0)]);
        let other = map(&[(1, 9.0), (2, 4.0), (3, 8.0)]);
        assert!((calculate_similarity(&me, &other) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_depends_on_current_side() {
        // Overlap is counted from the current user's ratings
        let me = map(&[(1, 5.0), (2, 5.0), (3, 5.0)]);
        let other = map(&[(1, 5.0), (2, 5.0), (3, 5.0), (4, 5.0), (5, 5.0)]);
        assert_eq!(calculate_similarity(&me, &other), 1.0);
        assert_eq!(calculate_similarity(&map(&[(1, 5.0), (2, 5.0)]), &other), DEFAULT_SIMILARITY);
    }

    #[test]
    fn test_similarity_map() {
        let me = map(&[(1, 8.0), (2, 8.0), (3, 8.0)]);
        let close = map(&[(1, 8.0), (2, 8.0), (3, 8.0)]);
        let sparse = map(&[(1, 8.0)]);

        let sims = similarity_map(&me, &[(7, &close), (8, &sparse)]);
        assert_eq!(sims[&7], 1.0);
        assert_eq!(sims[&8], DEFAULT_SIMILARITY);
    }
}
