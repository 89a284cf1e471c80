//! Data models for the storage layer

use crate::cli::types::{DateRange, GameId, PitcherId, Season, TeamCode};
use crate::error::PitchError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Throwing hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hand::Left => "L",
            Hand::Right => "R",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "L" | "l" => Some(Hand::Left),
            "R" | "r" => Some(Hand::Right),
            _ => None,
        }
    }
}

/// Identity of a pitcher as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitcherIdentity {
    pub id: PitcherId,
    pub name: String,
    pub throws: Option<Hand>,
}

/// A team a pitcher appeared for in a given season.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamSeason {
    pub season: Season,
    pub team: TeamCode,
}

/// Pitcher information stored in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pitcher {
    pub id: PitcherId,
    pub name: String,
    pub throws: Option<Hand>,
    pub teams: Vec<TeamSeason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub date: NaiveDate,
    pub season: Season,
    pub home_team: TeamCode,
    pub away_team: TeamCode,
    pub is_final: bool,
}

/// Counting line for one pitcher in one game.
///
/// Innings are kept as outs recorded; `6.2` innings is stored as 20 outs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchingLine {
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

impl PitchingLine {
    pub fn innings_pitched(&self) -> f64 {
        f64::from(self.outs) / 3.0
    }
}

/// Format outs in baseball innings notation (`20` outs -> `"6.2"`).
pub fn innings_notation(outs: u32) -> String {
    format!("{}.{}", outs / 3, outs % 3)
}

/// Parse baseball innings notation into outs. Only `.0`, `.1` and `.2`
/// fractions are valid; `"6.2"` is 20 outs.
pub fn outs_from_innings_notation(notation: &str) -> Option<u32> {
    let notation = notation.trim();
    let (whole, frac) = match notation.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (notation, "0"),
    };
    let whole: u32 = whole.parse().ok()?;
    let frac: u32 = match frac {
        "" | "0" => 0,
        "1" => 1,
        "2" => 2,
        _ => return None,
    };
    whole.checked_mul(3)?.checked_add(frac)
}

/// Result of a single pitch, derived from the provider's pitch description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchOutcome {
    Ball,
    CalledStrike,
    SwingingStrike,
    Foul,
    InPlay,
    HitByPitch,
    Other,
}

impl PitchOutcome {
    /// Map a Statcast `description` value onto an outcome.
    pub fn from_description(description: &str) -> Self {
        match description.trim() {
            "ball" | "blocked_ball" | "intent_ball" | "pitchout" | "automatic_ball" => {
                PitchOutcome::Ball
            }
            "called_strike" | "automatic_strike" => PitchOutcome::CalledStrike,
            "swinging_strike" | "swinging_strike_blocked" | "missed_bunt" => {
                PitchOutcome::SwingingStrike
            }
            "foul" | "foul_tip" | "foul_bunt" | "bunt_foul_tip" | "foul_pitchout" => {
                PitchOutcome::Foul
            }
            "hit_into_play" | "hit_into_play_no_out" | "hit_into_play_score" => {
                PitchOutcome::InPlay
            }
            "hit_by_pitch" => PitchOutcome::HitByPitch,
            _ => PitchOutcome::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PitchOutcome::Ball => "ball",
            PitchOutcome::CalledStrike => "called_strike",
            PitchOutcome::SwingingStrike => "swinging_strike",
            PitchOutcome::Foul => "foul",
            PitchOutcome::InPlay => "in_play",
            PitchOutcome::HitByPitch => "hit_by_pitch",
            PitchOutcome::Other => "other",
        }
    }

    pub fn is_swing(&self) -> bool {
        matches!(
            self,
            PitchOutcome::SwingingStrike | PitchOutcome::Foul | PitchOutcome::InPlay
        )
    }

    pub fn is_whiff(&self) -> bool {
        matches!(self, PitchOutcome::SwingingStrike)
    }

    pub fn is_contact(&self) -> bool {
        matches!(self, PitchOutcome::Foul | PitchOutcome::InPlay)
    }

    pub fn is_called_strike(&self) -> bool {
        matches!(self, PitchOutcome::CalledStrike)
    }
}

impl fmt::Display for PitchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PitchOutcome {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ball" => Ok(PitchOutcome::Ball),
            "called_strike" => Ok(PitchOutcome::CalledStrike),
            "swinging_strike" => Ok(PitchOutcome::SwingingStrike),
            "foul" => Ok(PitchOutcome::Foul),
            "in_play" => Ok(PitchOutcome::InPlay),
            "hit_by_pitch" => Ok(PitchOutcome::HitByPitch),
            "other" => Ok(PitchOutcome::Other),
            _ => Err(PitchError::integrity(
                "stored pitch",
                format!("unknown pitch outcome `{s}`"),
            )),
        }
    }
}

/// Physical and result data for one pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pitch {
    pub pitch_type: Option<String>,
    pub release_speed: Option<f64>,
    pub spin_rate: Option<f64>,
    pub pfx_x: Option<f64>,
    pub pfx_z: Option<f64>,
    pub plate_x: Option<f64>,
    pub plate_z: Option<f64>,
    /// Statcast zone: 1-9 inside the strike zone, 11-14 outside.
    pub zone: Option<u8>,
    pub outcome: PitchOutcome,
}

impl Pitch {
    /// `None` when the zone was not tracked.
    pub fn in_zone(&self) -> Option<bool> {
        self.zone.map(|z| (1..=9).contains(&z))
    }
}

/// Stored appearance (one pitcher, one game).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub pitcher_id: PitcherId,
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub season: Season,
    pub team: TeamCode,
    pub line: PitchingLine,
    pub is_final: bool,
    pub synced_at: i64,
}

/// Stored pitch, joined with the appearance it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchEvent {
    pub pitcher_id: PitcherId,
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub seq: u32,
    pub pitch: Pitch,
}

/// Appearances and their pitches read under one transaction, so both halves
/// reflect the same set of writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchingSnapshot {
    pub appearances: Vec<Appearance>,
    pub events: Vec<PitchEvent>,
}

/// Validated appearance payload ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AppearanceRecord {
    pub pitcher: PitcherIdentity,
    pub team: TeamCode,
    pub line: PitchingLine,
    pub pitches: Vec<Pitch>,
}

/// Validated game with every pitcher appearance in it.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub game: Game,
    pub appearances: Vec<AppearanceRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceAction {
    Inserted,
    Replaced,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub action: ReplaceAction,
    /// Derived-metric cache rows dropped because they overlapped the game date.
    pub invalidated_metrics: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    NeverSynced,
    Partial,
    Complete,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::NeverSynced => "never_synced",
            SyncStatus::Partial => "partial",
            SyncStatus::Complete => "complete",
            SyncStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never_synced" => Ok(SyncStatus::NeverSynced),
            "partial" => Ok(SyncStatus::Partial),
            "complete" => Ok(SyncStatus::Complete),
            "failed" => Ok(SyncStatus::Failed),
            _ => Err(PitchError::integrity(
                "sync_state",
                format!("unknown sync status `{s}`"),
            )),
        }
    }
}

/// A (team, season) pair synchronized as one unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SyncUnit {
    pub team: TeamCode,
    pub season: Season,
}

impl SyncUnit {
    pub fn new(team: TeamCode, season: Season) -> Self {
        Self { team, season }
    }
}

impl fmt::Display for SyncUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.team, self.season)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub unit: SyncUnit,
    pub status: SyncStatus,
    pub last_synced_at: Option<i64>,
    pub fetched: Option<DateRange>,
    pub last_error: Option<String>,
}

impl SyncState {
    pub fn never_synced(unit: SyncUnit) -> Self {
        Self {
            unit,
            status: SyncStatus::NeverSynced,
            last_synced_at: None,
            fetched: None,
            last_error: None,
        }
    }

    /// Enter the fetching phase. Any status may be restarted.
    pub fn begin(&mut self) {
        self.status = SyncStatus::Partial;
    }

    /// Finish the unit with `fetched` as the new covered range.
    pub fn complete(&mut self, fetched: DateRange, at: i64) {
        self.status = SyncStatus::Complete;
        self.fetched = Some(fetched);
        self.last_synced_at = Some(at);
        self.last_error = None;
    }

    /// Mark the unit failed. The previously covered range is kept.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = SyncStatus::Failed;
        self.last_error = Some(error.into());
    }
}

/// Search criteria for pitchers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitcherFilter {
    /// Case-insensitive substring of the pitcher name.
    pub name: Option<String>,
    pub team: Option<TeamCode>,
    pub range: Option<DateRange>,
}

/// Pitcher with appearance totals within a search filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitcherSummary {
    pub pitcher: Pitcher,
    pub appearances: u32,
    pub first_appearance: Option<NaiveDate>,
    pub last_appearance: Option<NaiveDate>,
}

/// Cached metrics payload for one pitcher and date range.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetricRow {
    pub pitcher_id: PitcherId,
    pub range: DateRange,
    pub fingerprint: String,
    pub payload: String,
    pub computed_at: i64,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub pitchers: u64,
    pub games: u64,
    pub appearances: u64,
    pub pitch_events: u64,
    pub derived_metrics: u64,
}
