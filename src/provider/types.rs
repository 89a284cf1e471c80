//! Provider wire types and validation into typed records.

use crate::cli::types::{DateRange, GameId, PitcherId, Season, TeamCode};
use crate::error::{PitchError, Result};
use crate::storage::{
    outs_from_innings_notation, AppearanceRecord, Game, GameRecord, Hand, Pitch, PitchOutcome,
    PitcherIdentity, PitchingLine,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::future::Future;
use thiserror::Error;

/// One page of provider results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub games: Vec<Value>,
    #[serde(default)]
    pub next_page: Option<u32>,
}

/// Outcome of a single page request, before any retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("no data for the requested range")]
    NoData,

    #[error("rate limited by provider")]
    RateLimited,

    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("provider request failed: {0}")]
    Fatal(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::RateLimited | SourceError::Transient(_))
    }
}

/// A paginated source of game records keyed by team and date range.
pub trait StatsSource {
    /// Fetch page `page` (0-based) of games `team` played within `range`.
    fn fetch_page(
        &self,
        team: &TeamCode,
        range: &DateRange,
        page: u32,
    ) -> impl Future<Output = std::result::Result<RawPage, SourceError>> + Send;
}

/// Validate a raw provider game into a [`GameRecord`].
///
/// Any missing required field or invalid value rejects the whole game.
pub fn parse_game(raw: &Value) -> Result<GameRecord> {
    let obj = raw
        .as_object()
        .ok_or_else(|| PitchError::integrity("unknown", "game record is not an object"))?;

    let game_label = obj
        .get("game_pk")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let ctx = Ctx { game: &game_label };

    let id = GameId::new(ctx.req_u64(obj, "game_pk")?);
    let date_str = ctx.req_str(obj, "game_date")?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| ctx.err(format!("unparseable game_date `{date_str}`")))?;
    let home_team = ctx.req_team(obj, "home_team")?;
    let away_team = ctx.req_team(obj, "away_team")?;
    let is_final = match obj.get("status").and_then(Value::as_str) {
        Some(status) => status.eq_ignore_ascii_case("final"),
        None => obj.get("is_final").and_then(Value::as_bool).unwrap_or(false),
    };

    let game = Game {
        id,
        date,
        season: Season::of(date),
        home_team,
        away_team,
        is_final,
    };

    let pitchers = obj
        .get("pitchers")
        .and_then(Value::as_array)
        .ok_or_else(|| ctx.err("missing field `pitchers`"))?;

    let appearances = pitchers
        .iter()
        .map(|p| ctx.appearance(p))
        .collect::<Result<Vec<_>>>()?;

    Ok(GameRecord { game, appearances })
}

struct Ctx<'a> {
    game: &'a str,
}

impl Ctx<'_> {
    fn err(&self, reason: impl Into<String>) -> PitchError {
        PitchError::integrity(self.game, reason)
    }

    fn req_u64(&self, obj: &Map<String, Value>, key: &str) -> Result<u64> {
        match obj.get(key) {
            None | Some(Value::Null) => Err(self.err(format!("missing field `{key}`"))),
            Some(v) => v
                .as_u64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| self.err(format!("field `{key}` is not a non-negative integer"))),
        }
    }

    fn req_u32(&self, obj: &Map<String, Value>, key: &str) -> Result<u32> {
        let value = self.req_u64(obj, key)?;
        u32::try_from(value).map_err(|_| self.err(format!("field `{key}` out of range")))
    }

    fn opt_u32(&self, obj: &Map<String, Value>, key: &str) -> Result<u32> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(0),
            Some(_) => self.req_u32(obj, key),
        }
    }

    fn req_str<'v>(&self, obj: &'v Map<String, Value>, key: &str) -> Result<&'v str> {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.err(format!("missing field `{key}`")))
    }

    fn req_team(&self, obj: &Map<String, Value>, key: &str) -> Result<TeamCode> {
        let raw = self.req_str(obj, key)?;
        raw.parse()
            .map_err(|_| self.err(format!("unknown team `{raw}` in `{key}`")))
    }

    fn outs(&self, obj: &Map<String, Value>) -> Result<u32> {
        if obj.get("outs").is_some_and(|v| !v.is_null()) {
            return self.req_u32(obj, "outs");
        }
        let notation = match obj.get("innings_pitched") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(self.err("missing field `outs`/`innings_pitched`")),
        };
        outs_from_innings_notation(&notation)
            .ok_or_else(|| self.err(format!("invalid innings notation `{notation}`")))
    }

    fn appearance(&self, raw: &Value) -> Result<AppearanceRecord> {
        let obj = raw
            .as_object()
            .ok_or_else(|| self.err("pitcher entry is not an object"))?;

        let pitcher = PitcherIdentity {
            id: PitcherId::new(self.req_u32(obj, "pitcher")?),
            name: self.req_str(obj, "player_name")?.to_string(),
            throws: obj.get("p_throws").and_then(Value::as_str).and_then(Hand::from_code),
        };

        let line = PitchingLine {
            outs: self.outs(obj)?,
            runs: self.req_u32(obj, "runs")?,
            earned_runs: self.req_u32(obj, "earned_runs")?,
            hits: self.req_u32(obj, "hits")?,
            walks: self.req_u32(obj, "walks")?,
            hit_by_pitch: self.opt_u32(obj, "hit_by_pitch")?,
            strikeouts: self.req_u32(obj, "strikeouts")?,
            home_runs: self.req_u32(obj, "home_runs")?,
            batters_faced: self.req_u32(obj, "batters_faced")?,
        };

        let pitches = match obj.get("pitches") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|p| self.pitch(p))
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(self.err("field `pitches` is not an array")),
        };

        Ok(AppearanceRecord {
            pitcher,
            team: self.req_team(obj, "team")?,
            line,
            pitches,
        })
    }

    fn pitch(&self, raw: &Value) -> Result<Pitch> {
        let obj = raw
            .as_object()
            .ok_or_else(|| self.err("pitch entry is not an object"))?;

        let zone = match obj.get("zone") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let zone = v
                    .as_u64()
                    .filter(|z| (1..=9).contains(z) || (11..=14).contains(z))
                    .ok_or_else(|| self.err(format!("invalid zone `{v}`")))?;
                Some(zone as u8)
            }
        };

        let description = self.req_str(obj, "description")?;
        let f = |key: &str| obj.get(key).and_then(Value::as_f64);

        Ok(Pitch {
            pitch_type: obj
                .get("pitch_type")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty()),
            release_speed: f("release_speed"),
            spin_rate: f("release_spin_rate"),
            pfx_x: f("pfx_x"),
            pfx_z: f("pfx_z"),
            plate_x: f("plate_x"),
            plate_z: f("plate_z"),
            zone,
            outcome: PitchOutcome::from_description(description),
        })
    }
}
