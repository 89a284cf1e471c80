use super::{FipConstants, MetricValue};
use crate::cli::types::{DateRange, PitcherId, Season};
use crate::storage::{Appearance, PitchEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bucket for pitches the provider did not classify.
pub const UNKNOWN_PITCH_TYPE: &str = "UN";

/// Counting stats summed over a set of appearances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountingTotals {
    pub games: u32,
    pub outs: u32,
    pub runs: u32,
    pub earned_runs: u32,
    pub hits: u32,
    pub walks: u32,
    pub hit_by_pitch: u32,
    pub strikeouts: u32,
    pub home_runs: u32,
    pub batters_faced: u32,
}

impl CountingTotals {
    pub fn from_appearances(appearances: &[Appearance]) -> Self {
        appearances.iter().fold(Self::default(), |mut t, a| {
            t.games += 1;
            t.outs += a.line.outs;
            t.runs += a.line.runs;
            t.earned_runs += a.line.earned_runs;
            t.hits += a.line.hits;
            t.walks += a.line.walks;
            t.hit_by_pitch += a.line.hit_by_pitch;
            t.strikeouts += a.line.strikeouts;
            t.home_runs += a.line.home_runs;
            t.batters_faced += a.line.batters_faced;
            t
        })
    }

    pub fn innings_pitched(&self) -> f64 {
        f64::from(self.outs) / 3.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardMetrics {
    pub era: MetricValue,
    pub fip: MetricValue,
    pub whip: MetricValue,
    pub k_per_9: MetricValue,
    pub bb_per_9: MetricValue,
    pub hr_per_9: MetricValue,
}

/// ERA, FIP, WHIP and per-nine rates. `fip_constant` is the league constant
/// for the innings covered; without one FIP is undefined.
pub fn standard_metrics(totals: &CountingTotals, fip_constant: Option<f64>) -> StandardMetrics {
    let ip = totals.innings_pitched();
    let per_9 = |count: u32| MetricValue::ratio(9.0 * f64::from(count), ip);

    let fip_core = MetricValue::ratio(
        13.0 * f64::from(totals.home_runs) + 3.0 * f64::from(totals.walks)
            - 2.0 * f64::from(totals.strikeouts),
        ip,
    );
    let fip = match fip_constant {
        Some(constant) => fip_core.map(|core| core + constant),
        None => MetricValue::Undefined,
    };

    StandardMetrics {
        era: per_9(totals.earned_runs),
        fip,
        whip: MetricValue::ratio(f64::from(totals.walks + totals.hits), ip),
        k_per_9: per_9(totals.strikeouts),
        bb_per_9: per_9(totals.walks),
        hr_per_9: per_9(totals.home_runs),
    }
}

/// Innings-weighted league constant over the seasons the appearances span.
///
/// `None` when no innings were pitched or a season with innings has no
/// configured constant.
pub fn weighted_fip_constant(appearances: &[Appearance], constants: &FipConstants) -> Option<f64> {
    let mut outs_by_season: BTreeMap<Season, u32> = BTreeMap::new();
    for a in appearances {
        *outs_by_season.entry(a.season).or_default() += a.line.outs;
    }

    let total_outs: u32 = outs_by_season.values().sum();
    if total_outs == 0 {
        return None;
    }

    let mut weighted = 0.0;
    for (season, outs) in outs_by_season.into_iter().filter(|(_, outs)| *outs > 0) {
        weighted += constants.get(season)? * f64::from(outs);
    }
    Some(weighted / f64::from(total_outs))
}

/// Pitch-level tallies used by the plate discipline rates.
///
/// Pitches without a tracked zone count toward neither zone denominator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchCounts {
    pub pitches: u32,
    pub swings: u32,
    pub whiffs: u32,
    pub called_strikes: u32,
    pub zone_pitches: u32,
    pub zone_swings: u32,
    pub zone_contact: u32,
    pub outside_pitches: u32,
    pub outside_swings: u32,
    pub velocity_sum: f64,
    pub velocity_pitches: u32,
}

impl PitchCounts {
    pub fn from_events(events: &[PitchEvent]) -> Self {
        let mut c = Self::default();
        for e in events {
            let outcome = e.pitch.outcome;
            c.pitches += 1;
            c.swings += u32::from(outcome.is_swing());
            c.whiffs += u32::from(outcome.is_whiff());
            c.called_strikes += u32::from(outcome.is_called_strike());

            match e.pitch.in_zone() {
                Some(true) => {
                    c.zone_pitches += 1;
                    c.zone_swings += u32::from(outcome.is_swing());
                    c.zone_contact += u32::from(outcome.is_contact());
                }
                Some(false) => {
                    c.outside_pitches += 1;
                    c.outside_swings += u32::from(outcome.is_swing());
                }
                None => {}
            }

            if let Some(speed) = e.pitch.release_speed {
                c.velocity_sum += speed;
                c.velocity_pitches += 1;
            }
        }
        c
    }

    pub fn average_velocity(&self) -> MetricValue {
        MetricValue::ratio(self.velocity_sum, f64::from(self.velocity_pitches))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateDiscipline {
    /// Whiffs per pitch
    pub swstr: MetricValue,
    /// (Called strikes + whiffs) per pitch
    pub csw: MetricValue,
    /// Swings at pitches outside the zone per pitch outside the zone
    pub o_swing: MetricValue,
    /// Contact on swings inside the zone per swing inside the zone
    pub z_contact: MetricValue,
}

pub fn plate_discipline(counts: &PitchCounts) -> PlateDiscipline {
    let pitches = f64::from(counts.pitches);
    PlateDiscipline {
        swstr: MetricValue::ratio(f64::from(counts.whiffs), pitches),
        csw: MetricValue::ratio(f64::from(counts.called_strikes + counts.whiffs), pitches),
        o_swing: MetricValue::ratio(
            f64::from(counts.outside_swings),
            f64::from(counts.outside_pitches),
        ),
        z_contact: MetricValue::ratio(
            f64::from(counts.zone_contact),
            f64::from(counts.zone_swings),
        ),
    }
}

fn pitch_type_key(event: &PitchEvent) -> &str {
    event.pitch.pitch_type.as_deref().unwrap_or(UNKNOWN_PITCH_TYPE)
}

/// Share of pitches per pitch type. Unclassified pitches are grouped under
/// [`UNKNOWN_PITCH_TYPE`] so the shares of a non-empty set sum to one.
pub fn pitch_mix(events: &[PitchEvent]) -> BTreeMap<String, MetricValue> {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for e in events {
        *counts.entry(pitch_type_key(e)).or_default() += 1;
    }

    let total = events.len() as f64;
    counts
        .into_iter()
        .map(|(t, n)| (t.to_string(), MetricValue::ratio(f64::from(n), total)))
        .collect()
}

/// Usage share of a single pitch type; undefined for an empty set.
pub fn pitch_type_usage(events: &[PitchEvent], pitch_type: &str) -> MetricValue {
    let n = events.iter().filter(|e| pitch_type_key(e) == pitch_type).count();
    MetricValue::ratio(n as f64, events.len() as f64)
}

/// Per-pitch-type profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchTypeProfile {
    pub pitch_type: String,
    pub count: u32,
    pub usage: MetricValue,
    pub avg_velocity: MetricValue,
    pub avg_spin: MetricValue,
    pub avg_pfx_x: MetricValue,
    pub avg_pfx_z: MetricValue,
    /// Whiffs per swing
    pub whiff_rate: MetricValue,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    n: u32,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.n += 1;
        }
    }

    fn value(&self) -> MetricValue {
        MetricValue::ratio(self.sum, f64::from(self.n))
    }
}

#[derive(Default)]
struct TypeTally {
    count: u32,
    swings: u32,
    whiffs: u32,
    velocity: Mean,
    spin: Mean,
    pfx_x: Mean,
    pfx_z: Mean,
}

/// Arsenal table ordered by usage (most thrown first), ties by pitch type.
pub fn arsenal(events: &[PitchEvent]) -> Vec<PitchTypeProfile> {
    let mut tallies: BTreeMap<&str, TypeTally> = BTreeMap::new();
    for e in events {
        let tally = tallies.entry(pitch_type_key(e)).or_default();
        tally.count += 1;
        tally.swings += u32::from(e.pitch.outcome.is_swing());
        tally.whiffs += u32::from(e.pitch.outcome.is_whiff());
        tally.velocity.add(e.pitch.release_speed);
        tally.spin.add(e.pitch.spin_rate);
        tally.pfx_x.add(e.pitch.pfx_x);
        tally.pfx_z.add(e.pitch.pfx_z);
    }

    let total = events.len() as f64;
    let mut profiles: Vec<PitchTypeProfile> = tallies
        .into_iter()
        .map(|(pitch_type, t)| PitchTypeProfile {
            pitch_type: pitch_type.to_string(),
            count: t.count,
            usage: MetricValue::ratio(f64::from(t.count), total),
            avg_velocity: t.velocity.value(),
            avg_spin: t.spin.value(),
            avg_pfx_x: t.pfx_x.value(),
            avg_pfx_z: t.pfx_z.value(),
            whiff_rate: MetricValue::ratio(f64::from(t.whiffs), f64::from(t.swings)),
        })
        .collect();
    profiles.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pitch_type.cmp(&b.pitch_type)));
    profiles
}

/// Everything derived for one pitcher over one range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub pitcher_id: PitcherId,
    pub range: Option<DateRange>,
    pub totals: CountingTotals,
    /// Baseball notation, e.g. `"45.2"`
    pub innings_pitched: String,
    pub pitches: u32,
    pub standard: StandardMetrics,
    pub discipline: PlateDiscipline,
    pub average_velocity: MetricValue,
    pub pitch_mix: BTreeMap<String, MetricValue>,
    pub arsenal: Vec<PitchTypeProfile>,
}
