//! Error types for the MLB pitcher sync pipeline

use chrono::NaiveDate;
use thiserror::Error;


pub type Result<T> = std::result::Result<T, PitchError>;

#[derive(Error, Debug)]
pub enum PitchError {
    #[error("provider unavailable for {team} after {attempts} attempt(s): {reason}")]
    ProviderUnavailable {
        team: String,
        attempts: u32,
        reason: String,
    },

    #[error("malformed record for game {game}: {reason}")]
    DataIntegrity { game: String, reason: String },

    #[error("database error: {0}")]
    Repository(#[from] rusqlite::Error),

    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("invalid team code: {code}")]
    InvalidTeam { code: String },

    #[error("invalid date: {0}")]
    InvalidDate(#[from] chrono::ParseError),

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("failed to parse integer: {0}")]
    InvalidInteger(#[from] std::num::ParseIntError),

    #[error("failed to parse number: {0}")]
    InvalidNumber(#[from] std::num::ParseFloatError),

    #[error("unknown metric: {name}")]
    UnknownMetric { name: String },

    #[error("unknown bucket: {name}")]
    UnknownBucket { name: String },

    #[error("pitcher not found: {id}")]
    PitcherNotFound { id: u32 },
}

/// Coarse classification used when deciding whether a failure is scoped to a
/// single game, a single sync unit, or the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ProviderUnavailable,
    DataIntegrity,
    Repository,
    Configuration,
    Input,
}

impl PitchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PitchError::ProviderUnavailable { .. } | PitchError::Http(_) => {
                ErrorCategory::ProviderUnavailable
            }
            PitchError::DataIntegrity { .. } => ErrorCategory::DataIntegrity,
            PitchError::Repository(_)
            | PitchError::StoreUnavailable { .. }
            | PitchError::Json(_)
            | PitchError::Io(_) => ErrorCategory::Repository,
            PitchError::Config { .. } => ErrorCategory::Configuration,
            PitchError::InvalidTeam { .. }
            | PitchError::InvalidDate(_)
            | PitchError::InvalidDateRange { .. }
            | PitchError::InvalidInteger(_)
            | PitchError::InvalidNumber(_)
            | PitchError::UnknownMetric { .. }
            | PitchError::UnknownBucket { .. }
            | PitchError::PitcherNotFound { .. } => ErrorCategory::Input,
        }
    }

    pub(crate) fn integrity(game: impl Into<String>, reason: impl Into<String>) -> Self {
        PitchError::DataIntegrity {
            game: game.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        PitchError::Config {
            message: message.into(),
        }
    }
}
