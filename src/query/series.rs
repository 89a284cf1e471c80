//! Bucketed metric time series.

use crate::cli::types::DateRange;
use crate::error::{PitchError, Result};
use crate::metrics::{Metric, MetricValue, MetricsEngine};
use crate::storage::{Appearance, PitchEvent};
use chrono::{Datelike, Duration, Months, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Time-series granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// One point per date with an appearance.
    Game,
    /// ISO weeks starting Monday.
    Week,
    Month,
    /// Calendar year.
    Season,
}

impl Bucket {
    /// First day of the bucket containing `date`.
    pub fn start_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Bucket::Game => date,
            Bucket::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Bucket::Month => date.with_day(1).unwrap_or(date),
            Bucket::Season => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// First day of the bucket after the one starting at `start`.
    fn next_start(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Bucket::Game => start.succ_opt(),
            Bucket::Week => start.checked_add_signed(Duration::days(7)),
            Bucket::Month => start.checked_add_months(Months::new(1)),
            Bucket::Season => start.checked_add_months(Months::new(12)),
        }
    }

    /// Every bucket start overlapping `range`, in order.
    fn starts_in(&self, range: &DateRange) -> Vec<NaiveDate> {
        let mut starts = Vec::new();
        let mut current = Some(self.start_of(range.start()));
        while let Some(start) = current.filter(|s| *s <= range.end()) {
            starts.push(start);
            current = self.next_start(start);
        }
        starts
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bucket::Game => "game",
            Bucket::Week => "week",
            Bucket::Month => "month",
            Bucket::Season => "season",
        };
        f.write_str(name)
    }
}

impl FromStr for Bucket {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "game" => Ok(Bucket::Game),
            "week" => Ok(Bucket::Week),
            "month" => Ok(Bucket::Month),
            "season" | "year" => Ok(Bucket::Season),
            _ => Err(PitchError::UnknownBucket {
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub bucket_start: NaiveDate,
    pub value: MetricValue,
    pub appearances: u32,
}

#[derive(Default)]
struct BucketRows {
    appearances: Vec<Appearance>,
    events: Vec<PitchEvent>,
}

/// Compute one point per bucket. `Game` buckets only cover dates with an
/// appearance; calendar buckets cover all of `range`, empty ones undefined.
/// An open end of `range` is bounded by the data.
pub(crate) fn build_points(
    engine: &MetricsEngine,
    metric: &Metric,
    bucket: Bucket,
    range: Option<&DateRange>,
    appearances: Vec<Appearance>,
    events: Vec<PitchEvent>,
) -> Vec<SeriesPoint> {
    let data_dates = appearances
        .iter()
        .map(|a| a.game_date)
        .chain(events.iter().map(|e| e.game_date));
    let first = data_dates.clone().min();
    let last = data_dates.max();

    let mut grouped: BTreeMap<NaiveDate, BucketRows> = BTreeMap::new();
    for a in appearances {
        grouped
            .entry(bucket.start_of(a.game_date))
            .or_default()
            .appearances
            .push(a);
    }
    for e in events {
        grouped
            .entry(bucket.start_of(e.game_date))
            .or_default()
            .events
            .push(e);
    }

    let starts: Vec<NaiveDate> = match bucket {
        Bucket::Game => grouped.keys().copied().collect(),
        _ => {
            // Open range ends fall back to the first and last data dates.
            let open = DateRange::unbounded();
            let start = range.map(|r| r.start()).filter(|d| *d != open.start()).or(first);
            let end = range.map(|r| r.end()).filter(|d| *d != open.end()).or(last);
            match (start, end) {
                (Some(start), Some(end)) => DateRange::new(start, end)
                    .map(|span| bucket.starts_in(&span))
                    .unwrap_or_default(),
                _ => Vec::new(),
            }
        }
    };

    let empty = BucketRows::default();
    starts
        .par_iter()
        .map(|start| {
            let rows = grouped.get(start).unwrap_or(&empty);
            SeriesPoint {
                bucket_start: *start,
                value: engine.evaluate(metric, &rows.appearances, &rows.events),
                appearances: rows.appearances.len() as u32,
            }
        })
        .collect()
}
