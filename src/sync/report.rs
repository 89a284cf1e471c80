//! Outcome of a sync run.

use crate::cli::types::DateRange;
use crate::storage::SyncUnit;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Stored data already covers the requested range.
    UpToDate,
    /// The season has not started as of today.
    NotStarted,
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::UpToDate => "up to date",
            SkipReason::NotStarted => "season not started",
            SkipReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum UnitStatus {
    Complete,
    Failed,
    Skipped(SkipReason),
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Complete => f.write_str("complete"),
            UnitStatus::Failed => f.write_str("failed"),
            UnitStatus::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub unit: SyncUnit,
    pub status: UnitStatus,
    /// Ranges requested from the provider.
    pub fetched: Vec<DateRange>,
    pub games_written: u32,
    pub inserted: u32,
    pub replaced: u32,
    pub unchanged: u32,
    /// Malformed games that were logged and skipped.
    pub games_skipped: u32,
    pub metrics_invalidated: u32,
    pub error: Option<String>,
}

impl UnitReport {
    pub fn new(unit: SyncUnit) -> Self {
        Self {
            unit,
            status: UnitStatus::Complete,
            fetched: Vec::new(),
            games_written: 0,
            inserted: 0,
            replaced: 0,
            unchanged: 0,
            games_skipped: 0,
            metrics_invalidated: 0,
            error: None,
        }
    }

    pub fn skipped(unit: SyncUnit, reason: SkipReason) -> Self {
        Self {
            status: UnitStatus::Skipped(reason),
            ..Self::new(unit)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub units: Vec<UnitReport>,
}

impl SyncReport {
    pub fn failed(&self) -> impl Iterator<Item = &UnitReport> {
        self.units
            .iter()
            .filter(|u| u.status == UnitStatus::Failed)
    }

    pub fn count(&self, status: &UnitStatus) -> usize {
        self.units.iter().filter(|u| &u.status == status).count()
    }

    pub fn games_written(&self) -> u32 {
        self.units.iter().map(|u| u.games_written).sum()
    }

    /// Process exit code: 0 when no unit failed, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.failed().next().is_some() {
            1
        } else {
            0
        }
    }
}
