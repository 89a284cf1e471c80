//! Read-only query commands over stored games and derived metrics.
//!
//! Each handler prints either JSON (`--json`) or aligned text lines. The
//! text formatting lives in `format_*` functions so it can be tested without
//! capturing stdout.

use super::common::{to_json, CommandContext};
use crate::cli::types::{DateRange, PitcherId, Season, TeamCode};
use crate::metrics::{Metric, MetricValue, MetricsReport};
use crate::query::{
    Bucket, ChangeReport, MetricTrend, MonthlyStats, PeriodComparison, PeriodStats,
    SearchResults, SeasonComparison, SeasonTrend, StatChange, TimeSeries,
};
use crate::storage::{models::innings_notation, Appearance, PitcherFilter, SyncState};
use crate::Result;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

fn emit(
    as_json: bool,
    json: impl FnOnce() -> Result<String>,
    text: impl FnOnce() -> String,
) -> Result<()> {
    if as_json {
        println!("{}", json()?); // tarpaulin::skip
    } else {
        print!("{}", text()); // tarpaulin::skip
    }
    Ok(())
}

pub fn handle_search(ctx: &CommandContext, filter: PitcherFilter, as_json: bool) -> Result<()> {
    let results = ctx.query_service().search(&filter)?;
    emit(as_json, || to_json(&results), || format_search(&results))
}

pub fn handle_series(
    ctx: &CommandContext,
    pitcher_id: PitcherId,
    metric: &Metric,
    bucket: Bucket,
    range: Option<DateRange>,
    as_json: bool,
) -> Result<()> {
    let series = ctx
        .query_service()
        .time_series(pitcher_id, metric, range, bucket)?;
    emit(as_json, || to_json(&series), || format_series(&series))
}

pub fn handle_appearances(
    ctx: &CommandContext,
    pitcher_id: PitcherId,
    range: Option<DateRange>,
    as_json: bool,
) -> Result<()> {
    let appearances = ctx
        .query_service()
        .appearances(pitcher_id, range.as_ref())?;
    emit(
        as_json,
        || to_json(&appearances),
        || format_appearances(&appearances),
    )
}

pub fn handle_report(
    ctx: &CommandContext,
    pitcher_id: PitcherId,
    range: Option<DateRange>,
    as_json: bool,
) -> Result<()> {
    let report = ctx.query_service().pitcher_report(pitcher_id, range)?;
    emit(as_json, || to_json(&report), || format_report(&report))
}

pub fn handle_compare(
    ctx: &CommandContext,
    pitcher_id: PitcherId,
    season_a: Season,
    season_b: Season,
    as_json: bool,
) -> Result<()> {
    let comparison = ctx
        .query_service()
        .compare_seasons(pitcher_id, season_a, season_b)?;
    emit(
        as_json,
        || to_json(&comparison),
        || format_comparison(&comparison),
    )
}

pub fn handle_trend(
    ctx: &CommandContext,
    pitcher_id: PitcherId,
    metric: &Metric,
    bucket: Bucket,
    window: usize,
    range: Option<DateRange>,
    as_json: bool,
) -> Result<()> {
    let trend = ctx
        .query_service()
        .metric_trend(pitcher_id, metric, range, bucket, window)?;
    emit(as_json, || to_json(&trend), || format_trend(&trend))
}

pub fn handle_periods(
    ctx: &CommandContext,
    pitcher_id: PitcherId,
    metric: &Metric,
    period_a: DateRange,
    period_b: DateRange,
    as_json: bool,
) -> Result<()> {
    let cmp = ctx
        .query_service()
        .compare_periods(pitcher_id, metric, period_a, period_b)?;
    emit(as_json, || to_json(&cmp), || format_periods(&cmp))
}

pub fn handle_monthly(
    ctx: &CommandContext,
    pitcher_id: PitcherId,
    metric: &Metric,
    range: Option<DateRange>,
    as_json: bool,
) -> Result<()> {
    let months = ctx
        .query_service()
        .monthly_stats(pitcher_id, metric, range)?;
    emit(as_json, || to_json(&months), || format_monthly(&months))
}

pub fn handle_changes(
    ctx: &CommandContext,
    pitcher_id: PitcherId,
    metric: &Metric,
    window: usize,
    threshold: f64,
    range: Option<DateRange>,
    as_json: bool,
) -> Result<()> {
    let report = ctx
        .query_service()
        .performance_changes(pitcher_id, metric, range, window, threshold)?;
    emit(as_json, || to_json(&report), || format_changes(&report))
}

pub fn handle_seasons(
    ctx: &CommandContext,
    pitcher_id: PitcherId,
    metric: &Metric,
    seasons: &[Season],
    as_json: bool,
) -> Result<()> {
    let trend = ctx
        .query_service()
        .season_trend(pitcher_id, metric, seasons)?;
    emit(as_json, || to_json(&trend), || format_season_trend(&trend))
}

pub fn handle_status(ctx: &CommandContext, teams: &[TeamCode], as_json: bool) -> Result<()> {
    let filter = (!teams.is_empty()).then_some(teams);
    let states = ctx.query_service().sync_status(filter)?;
    emit(as_json, || to_json(&states), || format_status(&states))
}

fn percent(value: MetricValue) -> String {
    match value {
        MetricValue::Defined(v) => format!("{:.1}%", v * 100.0),
        MetricValue::Undefined => "-".to_string(),
    }
}

fn fixed(value: MetricValue, places: usize) -> String {
    match value {
        MetricValue::Defined(v) => format!("{v:.places$}"),
        MetricValue::Undefined => "-".to_string(),
    }
}

fn synced_at(state: &SyncState) -> String {
    state
        .last_synced_at
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

pub fn format_search(results: &SearchResults) -> String {
    let mut out = String::new();
    if results.pitchers.is_empty() {
        out.push_str("No pitchers found.\n");
    }
    for summary in &results.pitchers {
        let teams: Vec<String> = summary
            .pitcher
            .teams
            .iter()
            .map(|ts| format!("{} {}", ts.team, ts.season))
            .collect();
        let span = match (summary.first_appearance, summary.last_appearance) {
            (Some(first), Some(last)) => format!("{first}..{last}"),
            _ => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{:>8}  {:<24} {:<2} apps={:<4} {}  [{}]",
            summary.pitcher.id,
            summary.pitcher.name,
            summary.pitcher.throws.map(|h| h.as_str()).unwrap_or("-"),
            summary.appearances,
            span,
            teams.join(", ")
        );
    }
    out.push_str(&format_staleness(&results.sync_states));
    out
}

pub fn format_series(series: &TimeSeries) -> String {
    let mut out = format!(
        "Pitcher {} {} by {}\n",
        series.pitcher_id, series.metric, series.bucket
    );
    for point in &series.points {
        let _ = writeln!(
            out,
            "{}  {:>9}  ({} app)",
            point.bucket_start,
            point.value.to_string(),
            point.appearances
        );
    }
    out.push_str(&format_staleness(&series.sync_states));
    out
}

pub fn format_appearances(appearances: &[Appearance]) -> String {
    let mut out = String::new();
    if appearances.is_empty() {
        out.push_str("No appearances found.\n");
    }
    for a in appearances {
        let l = &a.line;
        let _ = writeln!(
            out,
            "{} {:>10} {} IP {:>5} H {:>2} ER {:>2} BB {:>2} K {:>2} HR {:>2}{}",
            a.game_date,
            a.game_id,
            a.team,
            innings_notation(l.outs),
            l.hits,
            l.earned_runs,
            l.walks,
            l.strikeouts,
            l.home_runs,
            if a.is_final { "" } else { "  (not final)" }
        );
    }
    out
}

pub fn format_report(report: &MetricsReport) -> String {
    let t = &report.totals;
    let s = &report.standard;
    let d = &report.discipline;
    let mut out = String::new();

    let range = report
        .range
        .filter(|r| *r != DateRange::unbounded())
        .map(|r| r.to_string())
        .unwrap_or_else(|| "all games".to_string());
    let _ = writeln!(out, "Pitcher {} ({range})", report.pitcher_id);
    let _ = writeln!(
        out,
        "G {}  IP {}  H {}  ER {}  BB {}  K {}  HR {}  BF {}  Pitches {}",
        t.games,
        report.innings_pitched,
        t.hits,
        t.earned_runs,
        t.walks,
        t.strikeouts,
        t.home_runs,
        t.batters_faced,
        report.pitches
    );
    let _ = writeln!(
        out,
        "ERA {}  FIP {}  WHIP {}  K/9 {}  BB/9 {}  HR/9 {}",
        fixed(s.era, 2),
        fixed(s.fip, 2),
        fixed(s.whip, 2),
        fixed(s.k_per_9, 1),
        fixed(s.bb_per_9, 1),
        fixed(s.hr_per_9, 1)
    );
    let _ = writeln!(
        out,
        "SwStr% {}  CSW% {}  O-Swing% {}  Z-Contact% {}  Velo {}",
        percent(d.swstr),
        percent(d.csw),
        percent(d.o_swing),
        percent(d.z_contact),
        fixed(report.average_velocity, 1)
    );

    if !report.arsenal.is_empty() {
        out.push_str("\nType  Count  Usage   Velo    Spin  Whiff%\n");
        for p in &report.arsenal {
            let _ = writeln!(
                out,
                "{:<4} {:>6} {:>6} {:>6} {:>7} {:>7}",
                p.pitch_type,
                p.count,
                percent(p.usage),
                fixed(p.avg_velocity, 1),
                fixed(p.avg_spin, 0),
                percent(p.whiff_rate)
            );
        }
    }
    out
}

pub fn format_comparison(cmp: &SeasonComparison) -> String {
    let mut out = format!(
        "Pitcher {}: {} vs {}\n",
        cmp.pitcher_id, cmp.season_a, cmp.season_b
    );
    for (name, delta) in &cmp.deltas {
        let _ = writeln!(out, "{name:<10} {:>9}", fixed_signed(*delta));
    }
    if !cmp.pitch_types.is_empty() {
        out.push_str("\nType  Usage A  Usage B   ΔVelo   ΔSpin  ΔWhiff\n");
        for p in &cmp.pitch_types {
            let _ = writeln!(
                out,
                "{:<4} {:>8} {:>8} {:>7} {:>7} {:>7}",
                p.pitch_type,
                percent(p.usage_a),
                percent(p.usage_b),
                fixed_signed(p.velocity_change),
                fixed_signed(p.spin_change),
                fixed_signed(p.whiff_rate_change)
            );
        }
    }
    out
}

fn fixed_signed(value: MetricValue) -> String {
    match value {
        MetricValue::Defined(v) => format!("{v:+.3}"),
        MetricValue::Undefined => "-".to_string(),
    }
}

pub fn format_trend(trend: &MetricTrend) -> String {
    let mut out = format!(
        "Pitcher {} {} by {}, rolling {}\n",
        trend.pitcher_id, trend.metric, trend.bucket, trend.window
    );
    for p in &trend.points {
        let _ = writeln!(
            out,
            "{}  {:>9.3}  avg {:>9.3}  {}",
            p.date, p.value, p.rolling_avg, p.direction
        );
    }
    out
}

fn stats_line(stats: &PeriodStats) -> String {
    format!(
        "n={:<4} mean {:>7} median {:>7} min {:>7} max {:>7} sd {:>7}",
        stats.count,
        fixed(stats.mean, 3),
        fixed(stats.median, 3),
        fixed(stats.min, 3),
        fixed(stats.max, 3),
        fixed(stats.std_dev, 3)
    )
}

fn change_line(name: &str, change: &StatChange) -> String {
    let pct = match change.percent {
        MetricValue::Defined(v) => format!("{v:+.1}%"),
        MetricValue::Undefined => "-".to_string(),
    };
    format!("{name:<7} {:>9} {:>9}\n", fixed_signed(change.change), pct)
}

pub fn format_periods(cmp: &PeriodComparison) -> String {
    let mut out = format!("Pitcher {} {}\n", cmp.pitcher_id, cmp.metric);
    let _ = writeln!(out, "A {:<24} {}", cmp.period_a.to_string(), stats_line(&cmp.stats_a));
    let _ = writeln!(out, "B {:<24} {}", cmp.period_b.to_string(), stats_line(&cmp.stats_b));
    out.push_str(&change_line("mean", &cmp.mean));
    out.push_str(&change_line("median", &cmp.median));
    out.push_str(&change_line("min", &cmp.min));
    out.push_str(&change_line("max", &cmp.max));
    out
}

pub fn format_monthly(months: &[MonthlyStats]) -> String {
    if months.is_empty() {
        return "No games found.\n".to_string();
    }
    let mut out = String::new();
    for m in months {
        let _ = writeln!(out, "{}  {}", m.month.format("%Y-%m"), stats_line(&m.stats));
    }
    out
}

pub fn format_changes(report: &ChangeReport) -> String {
    let mut out = format!(
        "Pitcher {} {}: {} values, window {}, threshold {}\n",
        report.pitcher_id, report.metric, report.samples, report.window, report.threshold
    );
    if report.change_points.is_empty() {
        out.push_str("No significant changes.\n");
    }
    for c in &report.change_points {
        let _ = writeln!(
            out,
            "{}  {:.3} -> {:.3} ({:+.3}, {})  d={:.2}",
            c.date,
            c.before_mean,
            c.after_mean,
            c.change,
            c.direction,
            c.effect_size
        );
    }
    out
}

pub fn format_season_trend(trend: &SeasonTrend) -> String {
    let mut out = format!("Pitcher {} {} by season\n", trend.pitcher_id, trend.metric);
    for s in &trend.seasons {
        let _ = writeln!(out, "{}  {:>9}", s.season, fixed(s.value, 3));
    }
    let _ = writeln!(out, "overall {}  mean {}", trend.overall, fixed(trend.mean, 3));
    if let (Some(hi), Some(lo)) = (trend.highest, trend.lowest) {
        let _ = writeln!(
            out,
            "high {} ({})  low {} ({})",
            fixed(hi.value, 3),
            hi.season,
            fixed(lo.value, 3),
            lo.season
        );
    }
    out
}

pub fn format_status(states: &[SyncState]) -> String {
    if states.is_empty() {
        return "No sync history.\n".to_string();
    }
    let mut out = String::new();
    for state in states {
        let fetched = state
            .fetched
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = write!(
            out,
            "{:<10} {:<13} {:<24} {}",
            state.unit.to_string(),
            state.status.as_str(),
            fetched,
            synced_at(state)
        );
        if let Some(err) = &state.last_error {
            let _ = write!(out, "  error: {err}");
        }
        out.push('\n');
    }
    out
}

/// Note for units that are not complete, so readers can judge staleness.
fn format_staleness(states: &[SyncState]) -> String {
    let stale: Vec<String> = states
        .iter()
        .filter(|s| s.status != crate::storage::SyncStatus::Complete)
        .map(|s| format!("{} ({})", s.unit, s.status))
        .collect();
    if stale.is_empty() {
        String::new()
    } else {
        format!("Note: incomplete sync for {}\n", stale.join(", "))
    }
}
