//! Shared fixtures for unit tests

use crate::cli::types::{GameId, PitcherId, Season, TeamCode};
use crate::error::PitchError;
use crate::provider::{RawPage, SourceError, StatsSource};
use crate::storage::{
    AppearanceRecord, Game, Hand, Pitch, PitchOutcome, PitcherIdentity, PitchingLine,
};
use crate::DateRange;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn team(code: &str) -> TeamCode {
    code.parse().unwrap()
}

pub(crate) fn game(id: u64, on: NaiveDate, home: &str, away: &str, is_final: bool) -> Game {
    Game {
        id: GameId::new(id),
        date: on,
        season: Season::of(on),
        home_team: team(home),
        away_team: team(away),
        is_final,
    }
}

pub(crate) fn line(
    outs: u32,
    earned_runs: u32,
    walks: u32,
    strikeouts: u32,
    home_runs: u32,
) -> PitchingLine {
    PitchingLine {
        outs,
        runs: earned_runs,
        earned_runs,
        hits: 4,
        walks,
        hit_by_pitch: 0,
        strikeouts,
        home_runs,
        batters_faced: outs + 4 + walks,
    }
}

pub(crate) fn pitch(pitch_type: &str, speed: f64, zone: u8, outcome: PitchOutcome) -> Pitch {
    Pitch {
        pitch_type: Some(pitch_type.to_string()),
        release_speed: Some(speed),
        spin_rate: Some(2300.0),
        pfx_x: Some(-0.5),
        pfx_z: Some(1.2),
        plate_x: Some(0.1),
        plate_z: Some(2.5),
        zone: Some(zone),
        outcome,
    }
}

pub(crate) fn record(
    pitcher_id: u32,
    name: &str,
    team_code: &str,
    line: PitchingLine,
    pitches: Vec<Pitch>,
) -> AppearanceRecord {
    AppearanceRecord {
        pitcher: PitcherIdentity {
            id: PitcherId::new(pitcher_id),
            name: name.to_string(),
            throws: Some(Hand::Right),
        },
        team: team(team_code),
        line,
        pitches,
    }
}

/// Provider-shaped JSON for one game with a single pitcher line per team.
pub(crate) fn raw_game(
    game_pk: u64,
    on: &str,
    home: &str,
    away: &str,
    pitchers: Vec<Value>,
) -> Value {
    json!({
        "game_pk": game_pk,
        "game_date": on,
        "home_team": home,
        "away_team": away,
        "status": "final",
        "pitchers": pitchers,
    })
}

pub(crate) fn raw_pitcher(
    id: u32,
    name: &str,
    team_code: &str,
    innings: &str,
    earned_runs: u32,
) -> Value {
    json!({
        "pitcher": id,
        "player_name": name,
        "p_throws": "R",
        "team": team_code,
        "innings_pitched": innings,
        "runs": earned_runs,
        "earned_runs": earned_runs,
        "hits": 5,
        "walks": 2,
        "hit_by_pitch": 0,
        "strikeouts": 7,
        "home_runs": 1,
        "batters_faced": 25,
        "pitches": [
            {"pitch_type": "FF", "release_speed": 96.1, "release_spin_rate": 2410,
             "pfx_x": -0.6, "pfx_z": 1.4, "plate_x": 0.2, "plate_z": 2.8, "zone": 5,
             "description": "called_strike"},
            {"pitch_type": "SL", "release_speed": 87.4, "release_spin_rate": 2650,
             "pfx_x": 0.4, "pfx_z": 0.1, "plate_x": 1.1, "plate_z": 1.6, "zone": 14,
             "description": "swinging_strike"},
            {"pitch_type": "FF", "release_speed": 96.8, "release_spin_rate": 2395,
             "pfx_x": -0.7, "pfx_z": 1.5, "plate_x": -0.1, "plate_z": 3.0, "zone": 2,
             "description": "hit_into_play"}
        ],
    })
}

/// Scripted responses for one (team, page) key.
type Script = VecDeque<std::result::Result<RawPage, SourceError>>;

/// In-memory `StatsSource` that replays scripted pages per team.
///
/// Pages are served in request order; once a team's script is exhausted the
/// source answers `NoData`. Every request is recorded.
#[derive(Default)]
pub(crate) struct FakeSource {
    scripts: Mutex<HashMap<(String, u32), Script>>,
    requests: Mutex<Vec<(String, DateRange, u32)>>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(
        &self,
        team_code: &str,
        page: u32,
        response: std::result::Result<RawPage, SourceError>,
    ) {
        self.scripts
            .lock()
            .unwrap()
            .entry((team_code.to_string(), page))
            .or_default()
            .push_back(response);
    }

    pub(crate) fn push_games(
        &self,
        team_code: &str,
        page: u32,
        games: Vec<Value>,
        next_page: Option<u32>,
    ) {
        self.push(team_code, page, Ok(RawPage { games, next_page }));
    }

    pub(crate) fn requests(&self) -> Vec<(String, DateRange, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

impl StatsSource for FakeSource {
    async fn fetch_page(
        &self,
        team: &TeamCode,
        range: &DateRange,
        page: u32,
    ) -> std::result::Result<RawPage, SourceError> {
        self.requests
            .lock()
            .unwrap()
            .push((team.to_string(), *range, page));
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&(team.to_string(), page))
            .and_then(|script| script.pop_front());
        next.unwrap_or(Err(SourceError::NoData))
    }
}

pub(crate) fn assert_integrity(err: &PitchError) {
    assert!(
        matches!(err, PitchError::DataIntegrity { .. }),
        "expected DataIntegrity, got {err:?}"
    );
}
