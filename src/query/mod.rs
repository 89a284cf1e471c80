//! Read-only queries over the local store.
//!
//! Nothing here triggers a sync. Results that depend on freshness carry the
//! relevant [`SyncState`] rows so callers can judge staleness themselves.

pub mod compare;
pub mod series;
pub mod trend;


pub use compare::{PitchTypeDelta, SeasonComparison};
pub use series::{Bucket, SeriesPoint};
pub use trend::{
    ChangePoint, ChangeReport, MetricTrend, MonthlyStats, PeriodComparison, PeriodStats,
    SeasonTrend, SeasonValue, StatChange, TrendDirection, TrendPoint,
};

use crate::cli::types::{DateRange, PitcherId, Season, TeamCode};
use crate::error::{PitchError, Result};
use crate::metrics::{Metric, MetricsEngine, MetricsReport};
use crate::storage::{Appearance, PitcherFilter, PitcherSummary, Repository, SyncState};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::debug;

const REPORT_CACHE_CAPACITY: usize = 256;

type ReportKey = (PitcherId, DateRange, i64);

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub pitchers: Vec<PitcherSummary>,
    pub sync_states: Vec<SyncState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    pub pitcher_id: PitcherId,
    pub metric: String,
    pub bucket: Bucket,
    pub range: Option<DateRange>,
    pub points: Vec<SeriesPoint>,
    pub sync_states: Vec<SyncState>,
}

pub struct QueryService {
    repo: Arc<Repository>,
    engine: MetricsEngine,
    reports: Mutex<LruCache<ReportKey, MetricsReport>>,
}

impl QueryService {
    pub fn new(repo: Arc<Repository>, engine: MetricsEngine) -> Self {
        let capacity = NonZeroUsize::new(REPORT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            repo,
            engine,
            reports: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn engine(&self) -> &MetricsEngine {
        &self.engine
    }

    pub fn search(&self, filter: &PitcherFilter) -> Result<SearchResults> {
        let pitchers = self.repo.search_pitchers(filter)?;
        let sync_states = match &filter.team {
            Some(team) => self.repo.sync_states(Some(std::slice::from_ref(team)))?,
            None => self.repo.sync_states(None)?,
        };
        Ok(SearchResults {
            pitchers,
            sync_states,
        })
    }

    pub fn time_series(
        &self,
        pitcher_id: PitcherId,
        metric: &Metric,
        range: Option<DateRange>,
        bucket: Bucket,
    ) -> Result<TimeSeries> {
        let teams = self.pitcher_team_codes(pitcher_id)?;
        let rows = self.repo.pitching_snapshot(pitcher_id, range.as_ref())?;
        let points = series::build_points(
            &self.engine,
            metric,
            bucket,
            range.as_ref(),
            rows.appearances,
            rows.events,
        );
        debug!(%pitcher_id, %metric, %bucket, points = points.len(), "built time series");

        Ok(TimeSeries {
            pitcher_id,
            metric: metric.name(),
            bucket,
            range,
            points,
            sync_states: self.repo.sync_states(Some(teams.as_slice()))?,
        })
    }

    pub fn appearances(
        &self,
        pitcher_id: PitcherId,
        range: Option<&DateRange>,
    ) -> Result<Vec<Appearance>> {
        self.ensure_pitcher(pitcher_id)?;
        self.repo.appearances(pitcher_id, range)
    }

    /// Full metrics report for a pitcher. `None` covers every stored game.
    pub fn pitcher_report(
        &self,
        pitcher_id: PitcherId,
        range: Option<DateRange>,
    ) -> Result<MetricsReport> {
        let range = range.unwrap_or_else(DateRange::unbounded);
        let version = self
            .repo
            .pitcher_data_version(pitcher_id)?
            .ok_or(PitchError::PitcherNotFound {
                id: pitcher_id.as_u32(),
            })?;
        let key = (pitcher_id, range, version);

        if let Some(report) = self.reports()?.get(&key) {
            debug!(%pitcher_id, %range, "report served from memory");
            return Ok(report.clone());
        }

        let report = self.engine.report_cached(&self.repo, pitcher_id, &range)?;
        self.reports()?.put(key, report.clone());
        Ok(report)
    }

    pub fn compare_seasons(
        &self,
        pitcher_id: PitcherId,
        season_a: Season,
        season_b: Season,
    ) -> Result<SeasonComparison> {
        let report_a = self.pitcher_report(pitcher_id, Some(season_a.window()))?;
        let report_b = self.pitcher_report(pitcher_id, Some(season_b.window()))?;
        Ok(compare::compare_reports(
            pitcher_id, season_a, season_b, report_a, report_b,
        ))
    }

    /// Rolling-average trend of a metric, one input point per bucket.
    pub fn metric_trend(
        &self,
        pitcher_id: PitcherId,
        metric: &Metric,
        range: Option<DateRange>,
        bucket: Bucket,
        window: usize,
    ) -> Result<MetricTrend> {
        let series = self.time_series(pitcher_id, metric, range, bucket)?;
        Ok(MetricTrend {
            pitcher_id,
            metric: series.metric,
            bucket,
            window,
            points: trend::rolling_trend(&series.points, window),
        })
    }

    /// Per-game statistics of a metric in two date ranges and their changes.
    pub fn compare_periods(
        &self,
        pitcher_id: PitcherId,
        metric: &Metric,
        period_a: DateRange,
        period_b: DateRange,
    ) -> Result<PeriodComparison> {
        let a = self.time_series(pitcher_id, metric, Some(period_a), Bucket::Game)?;
        let b = self.time_series(pitcher_id, metric, Some(period_b), Bucket::Game)?;
        Ok(trend::compare_periods(
            pitcher_id,
            metric.name(),
            (period_a, &a.points),
            (period_b, &b.points),
        ))
    }

    /// Per-game statistics of a metric grouped by calendar month.
    pub fn monthly_stats(
        &self,
        pitcher_id: PitcherId,
        metric: &Metric,
        range: Option<DateRange>,
    ) -> Result<Vec<MonthlyStats>> {
        let series = self.time_series(pitcher_id, metric, range, Bucket::Game)?;
        Ok(trend::monthly_stats(&series.points))
    }

    /// Per-game change points of a metric.
    pub fn performance_changes(
        &self,
        pitcher_id: PitcherId,
        metric: &Metric,
        range: Option<DateRange>,
        window: usize,
        threshold: f64,
    ) -> Result<ChangeReport> {
        let series = self.time_series(pitcher_id, metric, range, Bucket::Game)?;
        let samples = series.points.iter().filter(|p| p.value.is_defined()).count();
        if samples < window.max(1) * 2 {
            debug!(%pitcher_id, samples, window, "too few values for change detection");
        }
        Ok(ChangeReport {
            pitcher_id,
            metric: series.metric,
            window,
            threshold,
            samples,
            change_points: trend::detect_changes(&series.points, window, threshold),
        })
    }

    /// One value per season with data, optionally limited to `seasons`.
    pub fn season_trend(
        &self,
        pitcher_id: PitcherId,
        metric: &Metric,
        seasons: &[Season],
    ) -> Result<SeasonTrend> {
        let series = self.time_series(pitcher_id, metric, None, Bucket::Season)?;
        let values = series
            .points
            .iter()
            .filter(|p| p.appearances > 0 || p.value.is_defined())
            .map(|p| SeasonValue {
                season: Season::of(p.bucket_start),
                value: p.value,
            })
            .filter(|v| seasons.is_empty() || seasons.contains(&v.season))
            .collect();
        Ok(trend::season_trend(pitcher_id, series.metric, values))
    }

    /// Teams with at least one recorded pitcher.
    pub fn teams(&self) -> Result<Vec<TeamCode>> {
        self.repo.teams()
    }

    pub fn sync_status(&self, teams: Option<&[TeamCode]>) -> Result<Vec<SyncState>> {
        self.repo.sync_states(teams)
    }

    fn ensure_pitcher(&self, pitcher_id: PitcherId) -> Result<()> {
        match self.repo.pitcher_data_version(pitcher_id)? {
            Some(_) => Ok(()),
            None => Err(PitchError::PitcherNotFound {
                id: pitcher_id.as_u32(),
            }),
        }
    }

    fn pitcher_team_codes(&self, pitcher_id: PitcherId) -> Result<Vec<TeamCode>> {
        self.ensure_pitcher(pitcher_id)?;
        let mut teams: Vec<TeamCode> = self
            .repo
            .pitcher_teams(pitcher_id)?
            .into_iter()
            .map(|ts| ts.team)
            .collect();
        teams.sort();
        teams.dedup();
        Ok(teams)
    }

    fn reports(&self) -> Result<std::sync::MutexGuard<'_, LruCache<ReportKey, MetricsReport>>> {
        self.reports.lock().map_err(|_| PitchError::StoreUnavailable {
            message: "report cache lock poisoned".to_string(),
        })
    }
}
