//! Derived pitching metrics.
//!
//! Everything here is a pure function of stored appearances and pitch
//! events; the engine additionally reads and writes the derived-metric cache.

pub mod compute;
pub mod engine;


pub use compute::{
    arsenal, pitch_mix, pitch_type_usage, plate_discipline, standard_metrics,
    weighted_fip_constant, CountingTotals, MetricsReport, PitchCounts, PitchTypeProfile,
    PlateDiscipline, StandardMetrics, UNKNOWN_PITCH_TYPE,
};
pub use engine::MetricsEngine;

use crate::cli::types::Season;
use crate::error::{PitchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A metric value, or `Undefined` when its denominator is zero.
///
/// Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum MetricValue {
    Defined(f64),
    Undefined,
}

impl MetricValue {
    /// `numerator / denominator`, undefined for a zero denominator.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            MetricValue::Undefined
        } else {
            MetricValue::Defined(numerator / denominator)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            MetricValue::Defined(v) => Some(v),
            MetricValue::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, MetricValue::Defined(_))
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            MetricValue::Defined(v) => MetricValue::Defined(f(v)),
            MetricValue::Undefined => MetricValue::Undefined,
        }
    }

    /// `self - other`, undefined unless both sides are defined.
    pub fn delta(self, other: MetricValue) -> Self {
        match (self, other) {
            (MetricValue::Defined(a), MetricValue::Defined(b)) => MetricValue::Defined(a - b),
            _ => MetricValue::Undefined,
        }
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(MetricValue::Undefined, MetricValue::Defined)
    }
}

impl From<MetricValue> for Option<f64> {
    fn from(value: MetricValue) -> Self {
        value.value()
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Defined(v) => write!(f, "{v:.3}"),
            MetricValue::Undefined => f.write_str("undefined"),
        }
    }
}

/// League FIP constant per season.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FipConstants(BTreeMap<Season, f64>);

impl FipConstants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, season: Season, constant: f64) -> Self {
        self.0.insert(season, constant);
        self
    }

    pub fn get(&self, season: Season) -> Option<f64> {
        self.0.get(&season).copied()
    }

    /// Stable text form used in cache fingerprints, e.g. `2023=3.255;2024=3.166`.
    pub fn digest(&self) -> String {
        self.0
            .iter()
            .map(|(season, c)| format!("{season}={c}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl FromStr for FipConstants {
    type Err = PitchError;

    /// Parses `2023=3.255,2024=3.166`.
    fn from_str(s: &str) -> Result<Self> {
        let mut constants = FipConstants::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (season, constant) = pair.split_once('=').ok_or_else(|| {
                PitchError::config(format!("expected SEASON=CONSTANT, got `{pair}`"))
            })?;
            constants
                .0
                .insert(season.parse()?, constant.trim().parse::<f64>()?);
        }
        Ok(constants)
    }
}

/// A metric selectable in time series queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Metric {
    Era,
    Fip,
    Whip,
    StrikeoutsPer9,
    WalksPer9,
    HomeRunsPer9,
    SwingingStrikeRate,
    CalledPlusSwingingStrikeRate,
    OutsideSwingRate,
    ZoneContactRate,
    AverageVelocity,
    /// Usage share of one pitch type.
    PitchMix(String),
}

impl Metric {
    pub fn name(&self) -> String {
        match self {
            Metric::Era => "era".to_string(),
            Metric::Fip => "fip".to_string(),
            Metric::Whip => "whip".to_string(),
            Metric::StrikeoutsPer9 => "k9".to_string(),
            Metric::WalksPer9 => "bb9".to_string(),
            Metric::HomeRunsPer9 => "hr9".to_string(),
            Metric::SwingingStrikeRate => "swstr".to_string(),
            Metric::CalledPlusSwingingStrikeRate => "csw".to_string(),
            Metric::OutsideSwingRate => "o-swing".to_string(),
            Metric::ZoneContactRate => "z-contact".to_string(),
            Metric::AverageVelocity => "velocity".to_string(),
            Metric::PitchMix(pitch_type) => format!("mix:{pitch_type}"),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Metric {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let metric = match lowered.as_str() {
            "era" => Metric::Era,
            "fip" => Metric::Fip,
            "whip" => Metric::Whip,
            "k9" | "k/9" => Metric::StrikeoutsPer9,
            "bb9" | "bb/9" => Metric::WalksPer9,
            "hr9" | "hr/9" => Metric::HomeRunsPer9,
            "swstr" | "swstr%" => Metric::SwingingStrikeRate,
            "csw" | "csw%" => Metric::CalledPlusSwingingStrikeRate,
            "o-swing" | "o-swing%" => Metric::OutsideSwingRate,
            "z-contact" | "z-contact%" => Metric::ZoneContactRate,
            "velocity" | "velo" => Metric::AverageVelocity,
            other => match other.strip_prefix("mix:") {
                Some(pitch_type) if !pitch_type.is_empty() => {
                    Metric::PitchMix(pitch_type.to_ascii_uppercase())
                }
                _ => {
                    return Err(PitchError::UnknownMetric {
                        name: s.to_string(),
                    })
                }
            },
        };
        Ok(metric)
    }
}
