//! Trend analysis over metric time series.
//!
//! Everything here works on the defined values of a series in date order;
//! undefined points are skipped rather than treated as zero.

use super::series::{Bucket, SeriesPoint};
use crate::cli::types::{DateRange, PitcherId, Season};
use crate::metrics::MetricValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_TREND_WINDOW: usize = 10;
/// Minimum Cohen's d between the two windows around a change point.
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    fn of_change(change: f64) -> Self {
        if change > 0.0 {
            TrendDirection::Increasing
        } else if change < 0.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One defined point with the trailing average ending at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub rolling_avg: f64,
    /// Movement of the rolling average since the previous point.
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    pub pitcher_id: PitcherId,
    pub metric: String,
    pub bucket: Bucket,
    pub window: usize,
    pub points: Vec<TrendPoint>,
}

/// Summary statistics of the defined values in a set of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub count: usize,
    pub mean: MetricValue,
    pub median: MetricValue,
    pub min: MetricValue,
    pub max: MetricValue,
    /// Sample standard deviation; needs two values.
    pub std_dev: MetricValue,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

/// `b - a` and the same change relative to `a`. The relative change is
/// undefined when `a` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatChange {
    pub change: MetricValue,
    pub percent: MetricValue,
}

impl StatChange {
    fn between(a: MetricValue, b: MetricValue) -> Self {
        let change = b.delta(a);
        let percent = match (change, a) {
            (MetricValue::Defined(c), MetricValue::Defined(base)) => {
                MetricValue::ratio(c * 100.0, base)
            }
            _ => MetricValue::Undefined,
        };
        Self { change, percent }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub pitcher_id: PitcherId,
    pub metric: String,
    pub period_a: DateRange,
    pub period_b: DateRange,
    pub stats_a: PeriodStats,
    pub stats_b: PeriodStats,
    pub mean: StatChange,
    pub median: StatChange,
    pub min: StatChange,
    pub max: StatChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    /// First day of the month.
    pub month: NaiveDate,
    pub stats: PeriodStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePoint {
    /// First point of the window after the change.
    pub date: NaiveDate,
    pub before_mean: f64,
    pub after_mean: f64,
    pub change: f64,
    pub percent: MetricValue,
    /// Cohen's d of the two windows.
    pub effect_size: f64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub pitcher_id: PitcherId,
    pub metric: String,
    pub window: usize,
    pub threshold: f64,
    /// Defined values examined.
    pub samples: usize,
    pub change_points: Vec<ChangePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonValue {
    pub season: Season,
    pub value: MetricValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonTrend {
    pub pitcher_id: PitcherId,
    pub metric: String,
    pub seasons: Vec<SeasonValue>,
    /// Sign of the correlation between season and value.
    pub overall: TrendDirection,
    pub highest: Option<SeasonValue>,
    pub lowest: Option<SeasonValue>,
    pub mean: MetricValue,
    /// Most recent season with data, defined or not.
    pub latest: Option<SeasonValue>,
}

fn defined(points: &[SeriesPoint]) -> Vec<(NaiveDate, f64)> {
    let mut values: Vec<(NaiveDate, f64)> = points
        .iter()
        .filter_map(|p| p.value.value().map(|v| (p.bucket_start, v)))
        .collect();
    values.sort_by_key(|(date, _)| *date);
    values
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    (values.len() > 1).then(|| {
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
    })
}

fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => None,
        n if n % 2 == 0 => Some((sorted[mid - 1] + sorted[mid]) / 2.0),
        _ => Some(sorted[mid]),
    }
}

/// Trailing average over up to `window` defined values, labelled by whether
/// the average rose, fell or held since the previous point. The first point
/// is always stable.
pub fn rolling_trend(points: &[SeriesPoint], window: usize) -> Vec<TrendPoint> {
    let window = window.max(1);
    let values = defined(points);
    let mut out: Vec<TrendPoint> = Vec::with_capacity(values.len());
    for (i, (date, value)) in values.iter().enumerate() {
        let start = (i + 1).saturating_sub(window);
        let tail: Vec<f64> = values[start..=i].iter().map(|(_, v)| *v).collect();
        let rolling_avg = mean(&tail).unwrap_or(*value);
        let direction = out
            .last()
            .map(|prev| TrendDirection::of_change(rolling_avg - prev.rolling_avg))
            .unwrap_or(TrendDirection::Stable);
        out.push(TrendPoint {
            date: *date,
            value: *value,
            rolling_avg,
            direction,
        });
    }
    out
}

pub fn period_stats(points: &[SeriesPoint]) -> PeriodStats {
    let dated = defined(points);
    let values: Vec<f64> = dated.iter().map(|(_, v)| *v).collect();
    PeriodStats {
        count: values.len(),
        mean: mean(&values).into(),
        median: median(&values).into(),
        min: values.iter().copied().reduce(f64::min).into(),
        max: values.iter().copied().reduce(f64::max).into(),
        std_dev: sample_variance(&values).map(f64::sqrt).into(),
        first: dated.first().map(|(d, _)| *d),
        last: dated.last().map(|(d, _)| *d),
    }
}

pub(crate) fn compare_periods(
    pitcher_id: PitcherId,
    metric: String,
    (period_a, points_a): (DateRange, &[SeriesPoint]),
    (period_b, points_b): (DateRange, &[SeriesPoint]),
) -> PeriodComparison {
    let stats_a = period_stats(points_a);
    let stats_b = period_stats(points_b);
    PeriodComparison {
        pitcher_id,
        metric,
        period_a,
        period_b,
        mean: StatChange::between(stats_a.mean, stats_b.mean),
        median: StatChange::between(stats_a.median, stats_b.median),
        min: StatChange::between(stats_a.min, stats_b.min),
        max: StatChange::between(stats_a.max, stats_b.max),
        stats_a,
        stats_b,
    }
}

/// Group points by calendar month, in month order.
pub fn monthly_stats(points: &[SeriesPoint]) -> Vec<MonthlyStats> {
    let mut by_month: BTreeMap<NaiveDate, Vec<SeriesPoint>> = BTreeMap::new();
    for point in points {
        by_month
            .entry(Bucket::Month.start_of(point.bucket_start))
            .or_default()
            .push(point.clone());
    }
    by_month
        .into_iter()
        .map(|(month, points)| MonthlyStats {
            month,
            stats: period_stats(&points),
        })
        .collect()
}

/// Positions where the `window` values before differ from the `window`
/// values after by more than `threshold` pooled standard deviations.
/// Needs at least `2 * window` defined values.
pub fn detect_changes(points: &[SeriesPoint], window: usize, threshold: f64) -> Vec<ChangePoint> {
    let window = window.max(1);
    let dated = defined(points);
    if dated.len() < window * 2 {
        return Vec::new();
    }
    let values: Vec<f64> = dated.iter().map(|(_, v)| *v).collect();

    (window..values.len() - window)
        .filter_map(|i| {
            let before = &values[i - window..i];
            let after = &values[i..i + window];
            let before_mean = mean(before)?;
            let after_mean = mean(after)?;
            let change = after_mean - before_mean;
            let pooled = match (sample_variance(before), sample_variance(after)) {
                (Some(b), Some(a)) => ((b + a) / 2.0).sqrt(),
                _ => 0.0,
            };
            let effect_size = if pooled > 0.0 { change.abs() / pooled } else { 0.0 };
            (effect_size > threshold).then(|| ChangePoint {
                date: dated[i].0,
                before_mean,
                after_mean,
                change,
                percent: MetricValue::ratio(change * 100.0, before_mean),
                effect_size,
                direction: TrendDirection::of_change(change),
            })
        })
        .collect()
}

fn correlation(pairs: &[(f64, f64)]) -> Option<f64> {
    let xs: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
    let ys: Vec<f64> = pairs.iter().map(|(_, y)| *y).collect();
    let (mx, my) = (mean(&xs)?, mean(&ys)?);
    let cov: f64 = pairs.iter().map(|(x, y)| (x - mx) * (y - my)).sum();
    let sx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum::<f64>().sqrt();
    let sy: f64 = ys.iter().map(|y| (y - my).powi(2)).sum::<f64>().sqrt();
    (sx > 0.0 && sy > 0.0).then(|| cov / (sx * sy))
}

/// Season-level summary of one value per season.
pub(crate) fn season_trend(
    pitcher_id: PitcherId,
    metric: String,
    seasons: Vec<SeasonValue>,
) -> SeasonTrend {
    let dated: Vec<(Season, f64)> = seasons
        .iter()
        .filter_map(|s| s.value.value().map(|v| (s.season, v)))
        .collect();
    let pairs: Vec<(f64, f64)> = dated
        .iter()
        .map(|(season, v)| (f64::from(season.as_u16()), *v))
        .collect();
    let overall = correlation(&pairs)
        .map(TrendDirection::of_change)
        .unwrap_or(TrendDirection::Stable);
    let as_value = |(season, v): &(Season, f64)| SeasonValue {
        season: *season,
        value: MetricValue::Defined(*v),
    };
    let values: Vec<f64> = dated.iter().map(|(_, v)| *v).collect();

    SeasonTrend {
        pitcher_id,
        metric,
        overall,
        highest: dated.iter().max_by(|a, b| a.1.total_cmp(&b.1)).map(as_value),
        lowest: dated.iter().min_by(|a, b| a.1.total_cmp(&b.1)).map(as_value),
        mean: mean(&values).into(),
        latest: seasons.iter().max_by_key(|s| s.season).copied(),
        seasons,
    }
}
