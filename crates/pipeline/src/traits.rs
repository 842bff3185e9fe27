//! The `Filter` seam of the scoring pipeline.

use anyhow::Result;
use sources::{Candidate, UserContext};

/// A pass over the candidate pool that drops shows the user shouldn't see.
///
/// Filters own the pool while they run and return what survives, in the
/// order they received it.
pub trait Filter: Send + Sync {
    /// Label used in pipeline logs
    fn name(&self) -> &str;

    fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>>;
}
