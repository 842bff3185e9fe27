//! Recency weighting.
//!
//! | age in days | immediate | planned |
//! |-------------|-----------|---------|
//! | < 30        | 1.3       | 1.1     |
//! | 30..=180    | 1.0       | 1.0     |
//! | > 180       | 0.8       | 0.8     |

use chrono::{DateTime, Utc};
use data_loader::ViewingMode;

/// Ratings younger than this get the freshness boost
pub const FRESH_DAYS: i64 = 30;

/// Ratings older than this are decayed
pub const STALE_DAYS: i64 = 180;

/// Whole days between `created_at` and `now`, floored.
///
/// Timestamps after `now` count as age 0.
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0)
}

pub fn recency_multiplier(age_days: i64, mode: ViewingMode) -> f32 {
    if age_days < FRESH_DAYS {
        match mode {
            ViewingMode::Immediate => 1.3,
            ViewingMode::Planned => 1.1,
        }
    } else if age_days <= STALE_DAYS {
        1.0
    } else {
        0.8
    }
}

pub fn recency_multiplier_at(
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    mode: ViewingMode,
) -> f32 {
    recency_multiplier(age_in_days(created_at, now), mode)
}
