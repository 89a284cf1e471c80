//! Season-over-season comparison of a pitcher's metrics.

use crate::cli::types::{PitcherId, Season};
use crate::metrics::{MetricValue, MetricsReport, PitchTypeProfile};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Change in one pitch type between two seasons. Usage of a type not thrown
/// in a season counts as zero; the other deltas need both seasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchTypeDelta {
    pub pitch_type: String,
    pub usage_a: MetricValue,
    pub usage_b: MetricValue,
    pub usage_change: MetricValue,
    pub velocity_change: MetricValue,
    pub spin_change: MetricValue,
    pub whiff_rate_change: MetricValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonComparison {
    pub pitcher_id: PitcherId,
    pub season_a: Season,
    pub season_b: Season,
    pub report_a: MetricsReport,
    pub report_b: MetricsReport,
    /// `b - a` per metric name
    pub deltas: BTreeMap<String, MetricValue>,
    pub pitch_types: Vec<PitchTypeDelta>,
}

pub(crate) fn compare_reports(
    pitcher_id: PitcherId,
    season_a: Season,
    season_b: Season,
    report_a: MetricsReport,
    report_b: MetricsReport,
) -> SeasonComparison {
    let pairs = [
        ("era", report_a.standard.era, report_b.standard.era),
        ("fip", report_a.standard.fip, report_b.standard.fip),
        ("whip", report_a.standard.whip, report_b.standard.whip),
        ("k9", report_a.standard.k_per_9, report_b.standard.k_per_9),
        ("bb9", report_a.standard.bb_per_9, report_b.standard.bb_per_9),
        ("hr9", report_a.standard.hr_per_9, report_b.standard.hr_per_9),
        ("swstr", report_a.discipline.swstr, report_b.discipline.swstr),
        ("csw", report_a.discipline.csw, report_b.discipline.csw),
        ("o-swing", report_a.discipline.o_swing, report_b.discipline.o_swing),
        ("z-contact", report_a.discipline.z_contact, report_b.discipline.z_contact),
        ("velocity", report_a.average_velocity, report_b.average_velocity),
    ];
    let deltas = pairs
        .into_iter()
        .map(|(name, a, b)| (name.to_string(), b.delta(a)))
        .collect();

    let by_type = |report: &MetricsReport| -> BTreeMap<String, PitchTypeProfile> {
        report
            .arsenal
            .iter()
            .map(|p| (p.pitch_type.clone(), p.clone()))
            .collect()
    };
    let types_a = by_type(&report_a);
    let types_b = by_type(&report_b);
    let all_types: BTreeSet<&String> = types_a.keys().chain(types_b.keys()).collect();

    let pitch_types = all_types
        .into_iter()
        .map(|t| {
            let a = types_a.get(t);
            let b = types_b.get(t);
            let usage_a = usage_share(a, &report_a);
            let usage_b = usage_share(b, &report_b);
            PitchTypeDelta {
                pitch_type: t.clone(),
                usage_a,
                usage_b,
                usage_change: usage_b.delta(usage_a),
                velocity_change: profile_change(a, b, |p| p.avg_velocity),
                spin_change: profile_change(a, b, |p| p.avg_spin),
                whiff_rate_change: profile_change(a, b, |p| p.whiff_rate),
            }
        })
        .collect();

    SeasonComparison {
        pitcher_id,
        season_a,
        season_b,
        report_a,
        report_b,
        deltas,
        pitch_types,
    }
}

fn usage_share(profile: Option<&PitchTypeProfile>, report: &MetricsReport) -> MetricValue {
    match profile {
        Some(p) => p.usage,
        None if report.pitches > 0 => MetricValue::Defined(0.0),
        None => MetricValue::Undefined,
    }
}

fn profile_change(
    a: Option<&PitchTypeProfile>,
    b: Option<&PitchTypeProfile>,
    field: impl Fn(&PitchTypeProfile) -> MetricValue,
) -> MetricValue {
    match (a, b) {
        (Some(a), Some(b)) => field(b).delta(field(a)),
        _ => MetricValue::Undefined,
    }
}
