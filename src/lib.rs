//! MLB Pitcher Statistics Library
//!
//! Synchronizes per-game pitching lines and pitch-level events from a
//! paginated advanced-statistics provider into a local SQLite store, then
//! derives standard and plate-discipline metrics from the stored rows.
//!
//! ## Features
//!
//! - **Incremental Sync**: (team, season) units with persisted state, retry and
//!   rate limiting, and per-unit failure isolation
//! - **Idempotent Storage**: appearance-level replace in one transaction
//! - **Derived Metrics**: ERA, FIP, WHIP, per-nine rates, SwStr%, CSW%,
//!   O-Swing%, Z-Contact%, pitch mix and per-pitch-type arsenal
//! - **Queries**: pitcher search, bucketed time series, season comparison
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mlb_pitchers::{Bucket, Config, Metric, MetricsEngine, PitcherId, QueryService, Repository};
//!
//! # fn example() -> mlb_pitchers::Result<()> {
//! let config = Config::from_env()?;
//! let repo = Arc::new(Repository::open(&config.database)?);
//! let queries = QueryService::new(repo, MetricsEngine::new(config.fip_constants.clone()));
//!
//! let series = queries.time_series(PitcherId::new(543037), &Metric::Era, None, Bucket::Month)?;
//! for point in &series.points {
//!     println!("{} {}", point.bucket_start, point.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Configuration
//!
//! Settings come from `MLB_PITCHERS_*` variables, for example:
//! ```bash
//! export MLB_PITCHERS_DB_PATH=/var/lib/mlb-pitchers/pitchers.db
//! export MLB_PITCHERS_FIP_CONSTANTS=2023=3.255,2024=3.166
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod query;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use cli::types::{DateRange, GameId, PitcherId, Season, TeamCode};
pub use config::Config;
pub use error::{ErrorCategory, PitchError, Result};
pub use metrics::{FipConstants, Metric, MetricValue, MetricsEngine, MetricsReport};
pub use provider::{HttpStatsSource, ProviderClient, RetryPolicy, StatsSource};
pub use query::{Bucket, QueryService};
pub use storage::{DatabaseLocation, Repository};
pub use sync::{CancelFlag, SyncOrchestrator, SyncReport, SyncRequest, SyncSettings};
