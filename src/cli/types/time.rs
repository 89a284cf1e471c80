//! Time-related types: MLB seasons and inclusive calendar date ranges.

use crate::error::{PitchError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Month/day bounds of the window a season's games are fetched from.
const SEASON_WINDOW_START: (u32, u32) = (3, 1);
const SEASON_WINDOW_END: (u32, u32) = (11, 30);

/// Type-safe wrapper for Season years
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Season(pub u16);

impl Season {
    pub fn new(year: u16) -> Self {
        Self(year)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Season of a calendar date (the year component).
    pub fn of(date: NaiveDate) -> Self {
        Self(date.year() as u16)
    }

    /// The season for the current local calendar year.
    pub fn current() -> Self {
        Self::of(chrono::Local::now().date_naive())
    }

    /// Full fetch window for this season, March 1st through November 30th.
    pub fn window(&self) -> DateRange {
        let year = i32::from(self.0);
        let start = NaiveDate::from_ymd_opt(year, SEASON_WINDOW_START.0, SEASON_WINDOW_START.1);
        let end = NaiveDate::from_ymd_opt(year, SEASON_WINDOW_END.0, SEASON_WINDOW_END.1);
        match (start, end) {
            (Some(start), Some(end)) => DateRange { start, end },
            // Fixed month/day pairs are valid for every year chrono can represent.
            _ => DateRange::unbounded(),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Season {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Inclusive calendar date range.
///
/// Both ends are inclusive; a range always satisfies `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PitchError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range standing in for "no date filter". Bounds are four-digit years so
    /// that ISO text comparison in SQLite stays ordered.
    pub fn unbounded() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2999, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }

    /// Build a range from optional CLI bounds; missing bounds fall back to
    /// the unbounded range's ends.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Option<Self>> {
        if start.is_none() && end.is_none() {
            return Ok(None);
        }
        let all = Self::unbounded();
        Self::new(start.unwrap_or(all.start), end.unwrap_or(all.end)).map(Some)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateRange { start, end })
    }

    /// Smallest range containing both.
    pub fn hull(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Clip the end of the range to `today`; `None` when the range starts after it.
    pub fn clip_to(&self, today: NaiveDate) -> Option<DateRange> {
        (self.start <= today).then(|| DateRange {
            start: self.start,
            end: self.end.min(today),
        })
    }

    /// The part of this range strictly before `date`; `None` when the range
    /// starts on or after it.
    pub fn ending_before(&self, date: NaiveDate) -> Option<DateRange> {
        (self.start < date).then(|| DateRange {
            start: self.start,
            end: self.end.min(date - Duration::days(1)),
        })
    }

    /// Parts of this range not covered by `covered`, in date order (at most two).
    pub fn subtract(&self, covered: &DateRange) -> Vec<DateRange> {
        let Some(overlap) = self.intersect(covered) else {
            return vec![*self];
        };

        let mut pieces = Vec::with_capacity(2);
        if self.start < overlap.start {
            pieces.push(DateRange {
                start: self.start,
                end: overlap.start - Duration::days(1),
            });
        }
        if overlap.end < self.end {
            pieces.push(DateRange {
                start: overlap.end + Duration::days(1),
                end: self.end,
            });
        }
        pieces
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl FromStr for DateRange {
    type Err = PitchError;

    /// Parses `YYYY-MM-DD..YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s.split_once("..").ok_or_else(|| PitchError::config(format!(
            "date range `{s}` must look like 2024-04-01..2024-04-30"
        )))?;
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")?;
        let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")?;
        Self::new(start, end)
    }
}
