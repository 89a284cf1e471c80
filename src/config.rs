//! Runtime configuration resolved from `MLB_PITCHERS_*` environment variables.

use crate::cli::types::Season;
use crate::error::{PitchError, Result};
use crate::metrics::FipConstants;
use crate::provider::RetryPolicy;
use crate::storage::DatabaseLocation;
use std::time::Duration;

pub const DB_PATH_ENV_VAR: &str = "MLB_PITCHERS_DB_PATH";
pub const PROVIDER_URL_ENV_VAR: &str = "MLB_PITCHERS_PROVIDER_URL";
pub const MIN_REQUEST_INTERVAL_ENV_VAR: &str = "MLB_PITCHERS_MIN_REQUEST_INTERVAL_MS";
pub const MAX_ATTEMPTS_ENV_VAR: &str = "MLB_PITCHERS_MAX_ATTEMPTS";
pub const INITIAL_BACKOFF_ENV_VAR: &str = "MLB_PITCHERS_INITIAL_BACKOFF_MS";
pub const MAX_BACKOFF_ENV_VAR: &str = "MLB_PITCHERS_MAX_BACKOFF_MS";
pub const REQUEST_TIMEOUT_ENV_VAR: &str = "MLB_PITCHERS_REQUEST_TIMEOUT_SECS";
pub const FIP_CONSTANTS_ENV_VAR: &str = "MLB_PITCHERS_FIP_CONSTANTS";
pub const CURRENT_SEASON_ENV_VAR: &str = "MLB_PITCHERS_CURRENT_SEASON";
pub const LOG_ENV_VAR: &str = "MLB_PITCHERS_LOG";

/// Base URL of the Statcast page export service.
pub const DEFAULT_PROVIDER_URL: &str = "http://127.0.0.1:8700/api/v1";

/// Pause between provider requests, in milliseconds.
pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseLocation,
    pub provider_url: String,
    pub min_request_interval: Duration,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub fip_constants: FipConstants,
    pub current_season: Season,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup, so tests can
    /// supply settings without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = match get(DB_PATH_ENV_VAR) {
            Some(path) => DatabaseLocation::parse(&path),
            None => DatabaseLocation::default_file()?,
        };

        let retry = RetryPolicy {
            max_attempts: parse_or(
                get(MAX_ATTEMPTS_ENV_VAR),
                MAX_ATTEMPTS_ENV_VAR,
                DEFAULT_MAX_ATTEMPTS,
            )?,
            initial_backoff: Duration::from_millis(parse_or(
                get(INITIAL_BACKOFF_ENV_VAR),
                INITIAL_BACKOFF_ENV_VAR,
                DEFAULT_INITIAL_BACKOFF_MS,
            )?),
            max_backoff: Duration::from_millis(parse_or(
                get(MAX_BACKOFF_ENV_VAR),
                MAX_BACKOFF_ENV_VAR,
                DEFAULT_MAX_BACKOFF_MS,
            )?),
        };
        if retry.max_attempts == 0 {
            return Err(PitchError::config(format!(
                "{MAX_ATTEMPTS_ENV_VAR} must be at least 1"
            )));
        }
        if retry.initial_backoff > retry.max_backoff {
            return Err(PitchError::config(format!(
                "{INITIAL_BACKOFF_ENV_VAR} must not exceed {MAX_BACKOFF_ENV_VAR}"
            )));
        }

        let fip_constants = match get(FIP_CONSTANTS_ENV_VAR) {
            Some(raw) => raw
                .parse::<FipConstants>()
                .map_err(|e| PitchError::config(format!("{FIP_CONSTANTS_ENV_VAR}: {e}")))?,
            None => FipConstants::new(),
        };

        let current_season = match get(CURRENT_SEASON_ENV_VAR) {
            Some(raw) => raw
                .parse::<Season>()
                .map_err(|e| PitchError::config(format!("{CURRENT_SEASON_ENV_VAR}: {e}")))?,
            None => Season::current(),
        };

        Ok(Self {
            database,
            provider_url: get(PROVIDER_URL_ENV_VAR)
                .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
            min_request_interval: Duration::from_millis(parse_or(
                get(MIN_REQUEST_INTERVAL_ENV_VAR),
                MIN_REQUEST_INTERVAL_ENV_VAR,
                DEFAULT_MIN_REQUEST_INTERVAL_MS,
            )?),
            retry,
            request_timeout: Duration::from_secs(parse_or(
                get(REQUEST_TIMEOUT_ENV_VAR),
                REQUEST_TIMEOUT_ENV_VAR,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            fip_constants,
            current_season,
            log_level: get(LOG_ENV_VAR).unwrap_or_else(|| "info".to_string()),
        })
    }

    /// The current season when no FIP constant is configured for it; FIP
    /// for its games reports undefined.
    pub fn season_without_fip_constant(&self) -> Option<Season> {
        self.fip_constants
            .get(self.current_season)
            .is_none()
            .then_some(self.current_season)
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| PitchError::config(format!("{key} has invalid value `{value}`"))),
        None => Ok(default),
    }
}
