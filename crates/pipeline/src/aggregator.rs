//! Score aggregation for personal candidates.
//!
//! Each contribution is weighted by the rater's similarity, a bonus when the
//! user follows the rater, and the recency of the rating. The weighted mean
//! enjoyment is then scaled by a mode-specific content multiplier.

use crate::recency::recency_multiplier_at;
use data_loader::{MAX_SCORE, RecommendStats, ShowId, ViewingMode, recommend_stats_from_flags};
use rayon::prelude::*;
use sources::{Candidate, Contribution, UserContext};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Distinct raters (other than the user) a show needs to be scored
pub const MIN_RATERS_PER_SHOW: usize = 2;

/// Share of a contribution's weight that comes from similarity
pub const SIMILARITY_WEIGHT: f32 = 0.7;

/// Weight added when the user follows the rater
pub const FOLLOW_BONUS: f32 = 0.3;

/// Mean sub-score at which a content bonus applies
pub const CONTENT_BONUS_THRESHOLD: f32 = 7.0;

/// Explanation used when no contributor carries weight
pub const FALLBACK_EXPLANATION: &str = "Based on similar users";

const EASY_WATCH: &str = "easy watch";
const EXPLAINED_CONTRIBUTORS: usize = 2;
const TOP_TAGS: usize = 3;

/// Aggregated score for one show
#[derive(Debug, Clone, PartialEq)]
pub struct ShowScore {
    pub show_id: ShowId,
    /// Final score in [0, 10]
    pub score: f32,
    /// Weighted mean enjoyment before the mode multiplier
    pub base_score: f32,
    pub multiplier: f32,
    pub explanation: String,
    /// Most frequent contributor tags, up to three
    pub tags: Vec<String>,
    pub stats: RecommendStats,
    pub rater_count: usize,
}

/// `easy watch`, `Easy_Watch` and `easy-watch` all match
pub fn is_easy_watch_tag(tag: &str) -> bool {
    normalize_tag(tag) == EASY_WATCH
}

fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mean of the values that are present; `None` when nobody supplied one
fn mean_of(values: impl Iterator<Item = Option<f32>>) -> Option<f32> {
    let (sum, count) = values
        .flatten()
        .fold((0.0f32, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f32)
}

fn meets_threshold(mean: Option<f32>) -> bool {
    mean.is_some_and(|m| m >= CONTENT_BONUS_THRESHOLD)
}

/// Content multiplier for one show, starting at 1.0
pub fn mode_multiplier(contributions: &[Contribution], mode: ViewingMode) -> f32 {
    let mut multiplier = 1.0;

    match mode {
        ViewingMode::Immediate => {
            if meets_threshold(mean_of(contributions.iter().map(|c| c.hook))) {
                multiplier += 0.1;
            }
            if meets_threshold(mean_of(contributions.iter().map(|c| Some(c.enjoyment)))) {
                multiplier += 0.1;
            }
            let easy_watch = contributions
                .iter()
                .flat_map(|c| c.tags.iter())
                .any(|tag| is_easy_watch_tag(tag));
            if easy_watch {
                multiplier += 0.15;
            }
        }
        ViewingMode::Planned => {
            if meets_threshold(mean_of(contributions.iter().map(|c| c.payoff))) {
                multiplier += 0.1;
            }
            if meets_threshold(mean_of(contributions.iter().map(|c| c.consistency))) {
                multiplier += 0.1;
            }
        }
    }

    multiplier
}

/// Render the top contributors by weight, e.g. `★ @bea • align 0.92 · @cy • align 0.81`
pub fn explain(weighted: &[(&Contribution, f32)]) -> String {
    let mut ranked: Vec<&(&Contribution, f32)> =
        weighted.iter().filter(|(_, weight)| *weight > 0.0).collect();

    if ranked.is_empty() {
        return FALLBACK_EXPLANATION.to_string();
    }

    ranked.sort_by(|(a, wa), (b, wb)| {
        wb.partial_cmp(wa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.rater_id.cmp(&b.rater_id))
    });

    ranked
        .into_iter()
        .take(EXPLAINED_CONTRIBUTORS)
        .map(|(c, _)| {
            let star = if c.is_followed { "★ " } else { "" };
            format!("{}@{} • align {:.2}", star, c.username, c.similarity)
        })
        .collect::<Vec<_>>()
        .join(" · ")
}

/// Most frequent tags, case-insensitively, keeping the first spelling seen
pub fn top_tags(contributions: &[Contribution]) -> Vec<String> {
    let mut counts: HashMap<String, (usize, String)> = HashMap::new();
    for tag in contributions.iter().flat_map(|c| c.tags.iter()) {
        let key = normalize_tag(tag);
        if key.is_empty() {
            continue;
        }
        counts.entry(key).or_insert_with(|| (0, tag.trim().to_string())).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, String))> = counts.into_iter().collect();
    ranked.sort_by(|(ka, (ca, _)), (kb, (cb, _))| cb.cmp(ca).then_with(|| ka.cmp(kb)));
    ranked
        .into_iter()
        .take(TOP_TAGS)
        .map(|(_, (_, tag))| tag)
        .collect()
}

/// Turns personal candidates into scored shows
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    min_raters: usize,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreAggregator {
    pub fn new() -> Self {
        Self {
            min_raters: MIN_RATERS_PER_SHOW,
        }
    }

    /// Configure the minimum distinct raters per show (default: 2)
    pub fn with_min_raters(mut self, min_raters: usize) -> Self {
        self.min_raters = min_raters;
        self
    }

    pub fn min_raters(&self) -> usize {
        self.min_raters
    }

    /// `(similarity * 0.7 + follow bonus) * recency`
    pub fn contribution_weight(contribution: &Contribution, context: &UserContext) -> f32 {
        let recency = recency_multiplier_at(contribution.created_at, context.now, context.mode);
        let base = contribution.similarity * SIMILARITY_WEIGHT;
        let follow = if contribution.is_followed {
            FOLLOW_BONUS
        } else {
            0.0
        };
        (base + follow) * recency
    }

    /// Score one candidate.
    ///
    /// `None` when the show has too few raters or no contributor carries
    /// weight.
    pub fn score(&self, candidate: &Candidate, context: &UserContext) -> Option<ShowScore> {
        let contributions: Vec<Contribution> = candidate
            .contributions
            .iter()
            .filter(|c| c.rater_id != context.user_id)
            .cloned()
            .collect();

        let rater_count = contributions
            .iter()
            .map(|c| c.rater_id)
            .collect::<HashSet<_>>()
            .len();
        if rater_count < self.min_raters {
            return None;
        }

        let weighted: Vec<(&Contribution, f32)> = contributions
            .iter()
            .map(|c| (c, Self::contribution_weight(c, context)))
            .collect();

        let (weighted_sum, total_weight) = weighted
            .iter()
            .fold((0.0f32, 0.0f32), |(sum, total), (c, weight)| {
                (sum + c.enjoyment * weight, total + weight)
            });
        if total_weight <= 0.0 {
            return None;
        }

        let base_score = weighted_sum / total_weight;
        let multiplier = mode_multiplier(&contributions, context.mode);
        let score = (base_score * multiplier).clamp(0.0, MAX_SCORE);

        Some(ShowScore {
            show_id: candidate.show_id,
            score,
            base_score,
            multiplier,
            explanation: explain(&weighted),
            tags: top_tags(&contributions),
            stats: recommend_stats_from_flags(contributions.iter().map(|c| c.recommend)),
            rater_count,
        })
    }

    /// Score every candidate in parallel, best first, ties by show id
    pub fn score_all(&self, candidates: &[Candidate], context: &UserContext) -> Vec<ShowScore> {
        let mut scores: Vec<ShowScore> = candidates
            .par_iter()
            .filter_map(|candidate| self.score(candidate, context))
            .collect();

        sort_by_score(&mut scores);
        debug!(
            "Scored {} of {} candidates",
            scores.len(),
            candidates.len()
        );
        scores
    }
}

/// Score descending, then show id ascending
pub fn sort_by_score(scores: &mut [ShowScore]) {
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.show_id.cmp(&b.show_id))
    });
}
