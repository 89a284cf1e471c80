//! Type-safe wrappers for pitchers, games, teams and calendar ranges.

pub mod ids;
pub mod team;
pub mod time;

pub use ids::{GameId, PitcherId};
pub use team::{TeamCode, MLB_TEAMS};
pub use time::{DateRange, Season};
