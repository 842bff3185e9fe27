//! Server crate for the show recommendation engine.
//!
//! This crate contains the orchestrator that coordinates all components
//! of the recommendation pipeline, plus the home deck and discovery
//! shelves built on top of it.

pub mod config;
pub mod fallback;
pub mod orchestrator;
pub mod shelves;

pub use config::{ConfigError, EngineConfig};
pub use fallback::{FallbackComposer, HasShowId};
pub use orchestrator::{HomePick, RecommendationOrchestrator, ShowRecommendation};
pub use shelves::{ShelfItem, ShelfKind};

// Small pure helpers callers use directly
pub use data_loader::compute_recommend_stats;
pub use sources::calculate_similarity;
