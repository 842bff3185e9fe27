//! Filter implementations for the candidate pipeline.

pub mod already_rated;
pub mod excluded_shows;
pub mod minimum_raters;

// Re-export for convenience
pub use already_rated::AlreadyRatedFilter;
pub use excluded_shows::ExcludedShowsFilter;
pub use minimum_raters::MinimumRatersFilter;
