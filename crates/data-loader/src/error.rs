//! Error types for the data-loader crate.

use crate::types::{ShowId, UserId};
use thiserror::Error;

/// Why a fixture directory couldn't be turned into a `DataIndex`
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Fixture file not found: {path}")]
    MissingFixture { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Carries the file and 1-based line number
    #[error("{file}:{line}: malformed record: {reason}")]
    MalformedLine {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("Rating by user {user_id} of show {show_id}: {field} = {value} is outside 0-10")]
    ScoreOutOfRange {
        user_id: UserId,
        show_id: ShowId,
        field: &'static str,
        value: f32,
    },

    /// Rating for a show the catalog doesn't have
    #[error("User {user_id} rated show {show_id}, which is not in the catalog")]
    UnknownShow { user_id: UserId, show_id: ShowId },

    #[error("User {user_id} follows themselves")]
    SelfFollow { user_id: UserId },
}

pub type Result<T> = std::result::Result<T, DataLoadError>;
