//! Scoring pipeline for show candidates.
//!
//! This crate provides:
//! - Recency weighting of individual ratings
//! - Filter trait and implementations for candidate filtering
//! - FilterPipeline for composing filters
//! - ScoreAggregator, which turns personal candidates into ranked scores
//!
//! ## Architecture
//! 1. Filters remove unwanted candidates (already rated, excluded, too few raters)
//! 2. ScoreAggregator weights every contribution and scores the survivors in parallel
//! 3. Scores come back sorted, best first, ties broken by show id
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{FilterPipeline, ScoreAggregator, MIN_RATERS_PER_SHOW};
//!
//! let filtered = FilterPipeline::personal(MIN_RATERS_PER_SHOW).apply(candidates, &context)?;
//! let scores = ScoreAggregator::new().score_all(&filtered, &context);
//! ```

pub mod aggregator;
pub mod filter_pipeline;
pub mod filters;
pub mod recency;
pub mod traits;

// Re-export main types
pub use aggregator::{FALLBACK_EXPLANATION, MIN_RATERS_PER_SHOW, ScoreAggregator, ShowScore};
pub use filter_pipeline::FilterPipeline;
pub use recency::{age_in_days, recency_multiplier, recency_multiplier_at};
pub use traits::Filter;
