//! CLI argument definitions and parsing structures.

use super::types::{DateRange, PitcherId, Season, TeamCode};
use crate::error::Result;
use crate::metrics::Metric;
use crate::query::trend::{DEFAULT_CHANGE_THRESHOLD, DEFAULT_TREND_WINDOW};
use crate::query::Bucket;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Optional inclusive date bounds shared between query commands
#[derive(Debug, Clone, Default, Args)]
pub struct RangeArgs {
    /// First date to include (YYYY-MM-DD).
    #[clap(long)]
    pub from: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD).
    #[clap(long)]
    pub to: Option<NaiveDate>,
}

impl RangeArgs {
    /// `None` when neither bound is given; a missing bound is open-ended.
    pub fn to_range(&self) -> Result<Option<DateRange>> {
        DateRange::from_bounds(self.from, self.to)
    }
}

#[derive(Debug, Parser)]
#[clap(
    name = "mlb-pitchers",
    about = "Sync MLB pitcher statistics into a local store and query derived metrics"
)]
pub struct MlbPitchers {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch game data from the stats provider into the local store.
    ///
    /// Work is split into (team, season) units; completed units are skipped
    /// unless `--force-update` is given. Exits non-zero if any unit failed.
    Update {
        /// Team code (repeatable): `--team NYY --team LAD`. Defaults to all 30 teams.
        #[clap(long = "team", short = 't')]
        teams: Vec<TeamCode>,

        /// Number of seasons to sync, counting back from the current one.
        #[clap(long, short = 'y', default_value_t = 1)]
        years: u16,

        /// Refetch and overwrite data that is already stored as final.
        #[clap(long)]
        force_update: bool,

        /// Delete all stored data before syncing.
        #[clap(long)]
        clear_db: bool,

        /// Output the sync report as JSON.
        #[clap(long)]
        json: bool,
    },

    /// Search stored pitchers.
    Search {
        /// Case-insensitive substring of the pitcher name.
        #[clap(long, short = 'n')]
        name: Option<String>,

        /// Only pitchers who appeared for this team.
        #[clap(long, short = 't')]
        team: Option<TeamCode>,

        #[clap(flatten)]
        range: RangeArgs,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// Metric time series for one pitcher.
    Series {
        #[clap(long, short = 'p')]
        pitcher_id: PitcherId,

        /// era, fip, whip, k9, bb9, hr9, swstr, csw, o-swing, z-contact, velocity or mix:<TYPE>.
        #[clap(long, short = 'm')]
        metric: Metric,

        /// game, week, month or season.
        #[clap(long, short = 'b', default_value_t = Bucket::Game)]
        bucket: Bucket,

        #[clap(flatten)]
        range: RangeArgs,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// List stored appearances for one pitcher.
    Appearances {
        #[clap(long, short = 'p')]
        pitcher_id: PitcherId,

        #[clap(flatten)]
        range: RangeArgs,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// Full metrics report for one pitcher.
    Report {
        #[clap(long, short = 'p')]
        pitcher_id: PitcherId,

        #[clap(flatten)]
        range: RangeArgs,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// Compare a pitcher's metrics and arsenal between two seasons.
    Compare {
        #[clap(long, short = 'p')]
        pitcher_id: PitcherId,

        #[clap(long)]
        season_a: Season,

        #[clap(long)]
        season_b: Season,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// Rolling-average trend of one metric.
    Trend {
        #[clap(long, short = 'p')]
        pitcher_id: PitcherId,

        #[clap(long, short = 'm')]
        metric: Metric,

        #[clap(long, short = 'b', default_value_t = Bucket::Game)]
        bucket: Bucket,

        /// Number of points in the rolling average.
        #[clap(long, short = 'w', default_value_t = DEFAULT_TREND_WINDOW)]
        window: usize,

        #[clap(flatten)]
        range: RangeArgs,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// Compare per-game statistics of one metric between two date ranges.
    Periods {
        #[clap(long, short = 'p')]
        pitcher_id: PitcherId,

        #[clap(long, short = 'm')]
        metric: Metric,

        /// First range, e.g. 2024-04-01..2024-05-31.
        #[clap(long)]
        period_a: DateRange,

        #[clap(long)]
        period_b: DateRange,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// Per-game statistics of one metric by calendar month.
    Monthly {
        #[clap(long, short = 'p')]
        pitcher_id: PitcherId,

        #[clap(long, short = 'm')]
        metric: Metric,

        #[clap(flatten)]
        range: RangeArgs,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// Detect games where one metric shifted sharply.
    Changes {
        #[clap(long, short = 'p')]
        pitcher_id: PitcherId,

        #[clap(long, short = 'm')]
        metric: Metric,

        /// Games on each side of a candidate change.
        #[clap(long, short = 'w', default_value_t = DEFAULT_TREND_WINDOW)]
        window: usize,

        /// Minimum effect size (Cohen's d).
        #[clap(long, default_value_t = DEFAULT_CHANGE_THRESHOLD)]
        threshold: f64,

        #[clap(flatten)]
        range: RangeArgs,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// One metric season by season.
    Seasons {
        #[clap(long, short = 'p')]
        pitcher_id: PitcherId,

        #[clap(long, short = 'm')]
        metric: Metric,

        /// Season to include (repeatable). Defaults to every season with data.
        #[clap(long = "season", short = 's')]
        seasons: Vec<Season>,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },

    /// Show sync state per (team, season).
    Status {
        /// Team code (repeatable). Defaults to every synced team.
        #[clap(long = "team", short = 't')]
        teams: Vec<TeamCode>,

        /// Output results as JSON instead of text lines.
        #[clap(long)]
        json: bool,
    },
}
