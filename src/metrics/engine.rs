//! Metrics engine: computes reports from stored rows and maintains the
//! derived-metric cache.

use super::compute::{
    arsenal, pitch_mix, pitch_type_usage, plate_discipline, standard_metrics,
    weighted_fip_constant, CountingTotals, MetricsReport, PitchCounts,
};
use super::{FipConstants, Metric, MetricValue};
use crate::cli::types::{DateRange, PitcherId};
use crate::error::{PitchError, Result};
use crate::storage::models::innings_notation;
use crate::storage::{Appearance, PitchEvent, Repository};
use tracing::{debug, warn};

/// Increment when the report payload layout or any formula changes.
const REPORT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct MetricsEngine {
    fip_constants: FipConstants,
}

impl MetricsEngine {
    pub fn new(fip_constants: FipConstants) -> Self {
        Self { fip_constants }
    }

    pub fn fip_constants(&self) -> &FipConstants {
        &self.fip_constants
    }

    /// Build a report from rows already read.
    pub fn compute(
        &self,
        pitcher_id: PitcherId,
        range: Option<DateRange>,
        appearances: &[Appearance],
        events: &[PitchEvent],
    ) -> MetricsReport {
        let totals = CountingTotals::from_appearances(appearances);
        let counts = PitchCounts::from_events(events);
        let fip_constant = weighted_fip_constant(appearances, &self.fip_constants);

        MetricsReport {
            pitcher_id,
            range,
            totals,
            innings_pitched: innings_notation(totals.outs),
            pitches: counts.pitches,
            standard: standard_metrics(&totals, fip_constant),
            discipline: plate_discipline(&counts),
            average_velocity: counts.average_velocity(),
            pitch_mix: pitch_mix(events),
            arsenal: arsenal(events),
        }
    }

    /// Evaluate a single metric over a set of rows.
    pub fn evaluate(
        &self,
        metric: &Metric,
        appearances: &[Appearance],
        events: &[PitchEvent],
    ) -> MetricValue {
        let standard = || {
            let totals = CountingTotals::from_appearances(appearances);
            standard_metrics(
                &totals,
                weighted_fip_constant(appearances, &self.fip_constants),
            )
        };
        let discipline = || plate_discipline(&PitchCounts::from_events(events));

        match metric {
            Metric::Era => standard().era,
            Metric::Fip => standard().fip,
            Metric::Whip => standard().whip,
            Metric::StrikeoutsPer9 => standard().k_per_9,
            Metric::WalksPer9 => standard().bb_per_9,
            Metric::HomeRunsPer9 => standard().hr_per_9,
            Metric::SwingingStrikeRate => discipline().swstr,
            Metric::CalledPlusSwingingStrikeRate => discipline().csw,
            Metric::OutsideSwingRate => discipline().o_swing,
            Metric::ZoneContactRate => discipline().z_contact,
            Metric::AverageVelocity => PitchCounts::from_events(events).average_velocity(),
            Metric::PitchMix(pitch_type) => pitch_type_usage(events, pitch_type),
        }
    }

    /// Compute a report directly from the repository, bypassing the cache.
    pub fn report(
        &self,
        repo: &Repository,
        pitcher_id: PitcherId,
        range: Option<&DateRange>,
    ) -> Result<MetricsReport> {
        let rows = repo.pitching_snapshot(pitcher_id, range)?;
        Ok(self.compute(pitcher_id, range.copied(), &rows.appearances, &rows.events))
    }

    /// Fingerprint tying a cached payload to the pitcher's data version and
    /// the configured FIP constants.
    pub fn fingerprint(&self, data_version: i64) -> String {
        format!(
            "r{REPORT_FORMAT_VERSION}|v{data_version}|fip:{}",
            self.fip_constants.digest()
        )
    }

    /// Report for `range`, served from the derived-metric cache when the
    /// stored fingerprint is current. A stale or unreadable row is recomputed
    /// and overwritten; cache write failures are logged and ignored.
    pub fn report_cached(
        &self,
        repo: &Repository,
        pitcher_id: PitcherId,
        range: &DateRange,
    ) -> Result<MetricsReport> {
        let version = repo
            .pitcher_data_version(pitcher_id)?
            .ok_or(PitchError::PitcherNotFound {
                id: pitcher_id.as_u32(),
            })?;
        let fingerprint = self.fingerprint(version);

        if let Some(row) = repo.derived_metrics(pitcher_id, range)? {
            if row.fingerprint == fingerprint {
                match serde_json::from_str::<MetricsReport>(&row.payload) {
                    Ok(report) => {
                        debug!(%pitcher_id, %range, "derived metrics cache hit");
                        return Ok(report);
                    }
                    Err(e) => warn!(
                        %pitcher_id,
                        %range,
                        error = %e,
                        "discarding unreadable cached metrics"
                    ),
                }
            }
        }

        let report = self.report(repo, pitcher_id, Some(range))?;
        let stored = serde_json::to_string(&report)
            .map_err(PitchError::from)
            .and_then(|payload| {
                repo.put_derived_metrics(pitcher_id, range, &fingerprint, &payload)
            });
        if let Err(e) = stored {
            warn!(%pitcher_id, %range, error = %e, "failed to cache derived metrics");
        }
        Ok(report)
    }
}
