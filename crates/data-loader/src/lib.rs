//! # Data Loader Crate
//!
//! Domain types for the show ratings corpus and an in-memory index over them.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Rating, Show, WatchAction, DataIndex, ...)
//! - **parser**: Parse JSON-lines fixture files into Rust structs
//! - **index**: Load a fixture directory, compute show stats, validate
//! - **stats**: The community recommend-rate statistic
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::DataIndex;
//! use std::path::Path;
//!
//! let index = DataIndex::load_from_files(Path::new("data/sample"))?;
//! let ratings = index.get_user_ratings(1);
//! println!("User 1 rated {} shows", ratings.len());
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod index;
pub mod stats;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use index::MAX_SCORE;
pub use stats::{compute_recommend_stats, recommend_stats_from_flags};
pub use types::{
    // Type aliases
    UserId,
    ShowId,
    // Core types
    Rating,
    Show,
    FollowEdge,
    Profile,
    WatchAction,
    DataIndex,
    ShowStats,
    RecommendStats,
    // Enums
    MediaKind,
    WatchActionKind,
    ViewingMode,
};
