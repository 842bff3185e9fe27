//! Parser for the JSON-lines fixture files.
//!
//! A fixture directory mirrors the backend tables, one JSON object per line:
//! - profiles.jsonl: {"user_id", "username"}
//! - shows.jsonl: {"id", "title", "poster_path"?, "first_air_date"?}
//! - ratings.jsonl: {"user_id", "show_id", "enjoyment", "hook"?, ..., "created_at"}
//! - follows.jsonl: {"follower", "followee"} (optional file)
//! - watch_actions.jsonl: {"user_id", "show_id", "kind", "created_at"} (optional file)
//!
//! Blank lines and lines starting with `#` are skipped.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read a required file into lines
fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(DataLoadError::MissingFixture {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(|s| s.to_string()).collect())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse every non-empty line of `path` as a `T`
pub fn parse_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let lines = read_lines(path)?;
    let file = file_label(path);
    let mut records = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() || line_trimmed.starts_with('#') {
            continue;
        }
        let record = serde_json::from_str(line_trimmed).map_err(|e| DataLoadError::MalformedLine {
            file: file.clone(),
            line: idx + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Like [`parse_json_lines`], but a missing file yields no records
fn parse_optional<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if path.exists() {
        parse_json_lines(path)
    } else {
        tracing::debug!("Optional fixture {} not present", path.display());
        Ok(Vec::new())
    }
}

pub fn parse_profiles(path: &Path) -> Result<Vec<Profile>> {
    parse_json_lines(path)
}

pub fn parse_shows(path: &Path) -> Result<Vec<Show>> {
    parse_json_lines(path)
}

pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    parse_json_lines(path)
}

pub fn parse_follows(path: &Path) -> Result<Vec<FollowEdge>> {
    parse_optional(path)
}

pub fn parse_watch_actions(path: &Path) -> Result<Vec<WatchAction>> {
    parse_optional(path)
}
