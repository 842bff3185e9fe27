//! Engine configuration.
//!
//! Loaded from `RECS_*` environment variables (a `.env` file is honoured),
//! with serde defaults for everything.

use data_loader::UserId;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("No authenticated user and dev mode is off")]
    Unauthenticated,

    #[error("Dev mode is on but RECS_DEV_USER_ID is not set")]
    MissingDevUser,
}

/// Tunables for the recommendation engine
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Bypass authentication and act as `dev_user_id`
    #[serde(default)]
    pub dev_mode: bool,

    #[serde(default)]
    pub dev_user_id: Option<UserId>,

    /// Size of the home deck
    #[serde(default = "default_home_target")]
    pub home_target: usize,

    /// Size of each discovery shelf
    #[serde(default = "default_shelf_target")]
    pub shelf_target: usize,

    #[serde(default = "default_min_raters_per_show")]
    pub min_raters_per_show: usize,

    /// How long a dismissal hides a show from the deck
    #[serde(default = "default_dismiss_window_days")]
    pub dismiss_window_days: i64,

    /// Entries requested from the external trending catalog per call
    #[serde(default = "default_trending_fetch_size")]
    pub trending_fetch_size: usize,
}

fn default_home_target() -> usize {
    10
}

fn default_shelf_target() -> usize {
    3
}

fn default_min_raters_per_show() -> usize {
    pipeline::MIN_RATERS_PER_SHOW
}

fn default_dismiss_window_days() -> i64 {
    sources::user_context::DISMISS_WINDOW_DAYS
}

fn default_trending_fetch_size() -> usize {
    20
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            dev_user_id: None,
            home_target: default_home_target(),
            shelf_target: default_shelf_target(),
            min_raters_per_show: default_min_raters_per_show(),
            dismiss_window_days: default_dismiss_window_days(),
            trending_fetch_size: default_trending_fetch_size(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit `(name, value)` pairs
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: EngineConfig = envy::prefixed("RECS_").from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_raters_per_show == 0 {
            return Err(ConfigError::Invalid {
                field: "min_raters_per_show",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.dismiss_window_days < 0 {
            return Err(ConfigError::Invalid {
                field: "dismiss_window_days",
                reason: format!("{} is negative", self.dismiss_window_days),
            });
        }
        Ok(())
    }

    /// The user a request runs as.
    ///
    /// An authenticated session always wins; without one, dev mode falls
    /// back to the configured dev user.
    pub fn resolve_user(&self, session: Option<UserId>) -> Result<UserId, ConfigError> {
        match session {
            Some(user_id) => Ok(user_id),
            None if self.dev_mode => self.dev_user_id.ok_or(ConfigError::MissingDevUser),
            None => Err(ConfigError::Unauthenticated),
        }
    }
}
