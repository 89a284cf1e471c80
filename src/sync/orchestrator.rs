//! Drives provider fetches into the repository, one (team, season) unit at a time.

use super::locks::{CancelFlag, UnitLocks};
use super::plan::{missing_ranges, reopen_from, requested_range, SyncRequest};
use super::report::{SkipReason, SyncReport, UnitReport, UnitStatus};
use crate::cli::types::{DateRange, Season};
use crate::error::{PitchError, Result};
use crate::provider::{ProviderClient, StatsSource};
use crate::storage::queries::now_epoch;
use crate::storage::{GameRecord, ReplaceAction, Repository, SyncUnit};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Clock inputs for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub current_season: Season,
    /// Requested ranges are clipped to this date.
    pub today: NaiveDate,
}

impl SyncSettings {
    pub fn new(current_season: Season, today: NaiveDate) -> Self {
        Self {
            current_season,
            today,
        }
    }
}

pub struct SyncOrchestrator<S> {
    repo: Arc<Repository>,
    client: ProviderClient<S>,
    settings: SyncSettings,
    locks: UnitLocks,
}

impl<S: StatsSource> SyncOrchestrator<S> {
    pub fn new(repo: Arc<Repository>, client: ProviderClient<S>, settings: SyncSettings) -> Self {
        Self {
            repo,
            client,
            settings,
            locks: UnitLocks::new(),
        }
    }

    /// Share a lock table with other orchestrators over the same store.
    pub fn with_locks(mut self, locks: UnitLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn client(&self) -> &ProviderClient<S> {
        &self.client
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Sync every unit of `request` in order.
    ///
    /// A failed unit is recorded and the run moves on. Only failures to
    /// read or persist sync state end the run early with `Err`.
    pub async fn run(&self, request: &SyncRequest, cancel: &CancelFlag) -> Result<SyncReport> {
        let units = request.units(self.settings.current_season);
        info!(
            units = units.len(),
            years = request.years,
            force = request.force,
            today = %self.settings.today,
            "starting sync"
        );

        let mut report = SyncReport::default();
        for unit in units {
            if cancel.is_cancelled() {
                debug!(team = %unit.team, season = %unit.season, "sync cancelled before unit");
                report
                    .units
                    .push(UnitReport::skipped(unit, SkipReason::Cancelled));
                continue;
            }

            let _guard = self.locks.lock(&unit).await?;
            let unit_report = self.sync_unit(unit, request.force).await?;
            report.units.push(unit_report);
        }

        info!(
            complete = report.count(&UnitStatus::Complete),
            failed = report.failed().count(),
            games_written = report.games_written(),
            "sync finished"
        );
        Ok(report)
    }

    async fn sync_unit(&self, unit: SyncUnit, force: bool) -> Result<UnitReport> {
        let Some(requested) = requested_range(unit.season, self.settings.today) else {
            debug!(team = %unit.team, season = %unit.season, "season not started");
            return Ok(UnitReport::skipped(unit, SkipReason::NotStarted));
        };

        let mut state = self.repo.sync_state(&unit)?;
        let reopen = match state.fetched {
            Some(fetched) if !force => {
                let earliest_open = self.repo.earliest_open_appearance(&unit.team, &fetched)?;
                reopen_from(unit.season, &fetched, earliest_open)
            }
            _ => None,
        };
        let missing = missing_ranges(&requested, &state, force, reopen);
        if missing.is_empty() {
            debug!(
                team = %unit.team,
                season = %unit.season,
                status = %state.status,
                "unit up to date"
            );
            return Ok(UnitReport::skipped(unit, SkipReason::UpToDate));
        }

        state.begin();
        self.repo.put_sync_state(&state)?;

        let mut report = UnitReport::new(unit.clone());
        report.fetched = missing.clone();
        info!(
            team = %unit.team,
            season = %unit.season,
            ranges = missing.len(),
            reopen = ?reopen,
            "syncing unit"
        );

        for range in missing {
            if let Err(err) = self.sync_range(&unit, range, force, &mut report).await {
                if matches!(err, PitchError::StoreUnavailable { .. }) {
                    return Err(err);
                }
                error!(
                    team = %unit.team,
                    season = %unit.season,
                    %range,
                    category = ?err.category(),
                    error = %err,
                    "unit failed"
                );
                state.fail(err.to_string());
                self.repo.put_sync_state(&state)?;
                report.status = UnitStatus::Failed;
                report.error = Some(err.to_string());
                return Ok(report);
            }
        }

        let fetched = state
            .fetched
            .map_or(requested, |previous| previous.hull(&requested));
        state.complete(fetched, now_epoch());
        self.repo.put_sync_state(&state)?;

        info!(
            team = %unit.team,
            season = %unit.season,
            games_written = report.games_written,
            games_skipped = report.games_skipped,
            "unit complete"
        );
        Ok(report)
    }

    async fn sync_range(
        &self,
        unit: &SyncUnit,
        range: DateRange,
        force: bool,
        report: &mut UnitReport,
    ) -> Result<()> {
        let mut feed = self.client.fetch(&unit.team, range);
        while let Some(item) = feed.next_game().await {
            let record = match item {
                Ok(record) => record,
                Err(err @ PitchError::DataIntegrity { .. }) => {
                    warn!(
                        team = %unit.team,
                        season = %unit.season,
                        error = %err,
                        "skipping malformed game"
                    );
                    report.games_skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            if !range.contains(record.game.date) {
                debug!(
                    team = %unit.team,
                    game_id = %record.game.id,
                    date = %record.game.date,
                    "ignoring game outside requested range"
                );
                continue;
            }

            self.write_game(unit, &record, force, report)?;
        }
        Ok(())
    }

    fn write_game(
        &self,
        unit: &SyncUnit,
        record: &GameRecord,
        force: bool,
        report: &mut UnitReport,
    ) -> Result<()> {
        let mut wrote = false;
        for appearance in record.appearances.iter().filter(|a| a.team == unit.team) {
            self.repo
                .upsert_pitcher(&appearance.pitcher, &appearance.team, unit.season)?;
            let outcome = self
                .repo
                .replace_appearance(&record.game, appearance, force)?;

            match outcome.action {
                ReplaceAction::Inserted => report.inserted += 1,
                ReplaceAction::Replaced => report.replaced += 1,
                ReplaceAction::Unchanged => report.unchanged += 1,
            }
            wrote |= outcome.action != ReplaceAction::Unchanged;
            report.metrics_invalidated += outcome.invalidated_metrics as u32;
        }

        if wrote {
            report.games_written += 1;
            debug!(team = %unit.team, game_id = %record.game.id, "game written");
        }
        Ok(())
    }
}
