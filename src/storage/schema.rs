//! Database schema and connection management

use crate::error::{PitchError, Result};
use dirs::cache_dir;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Where the SQLite store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

impl DatabaseLocation {
    /// `:memory:` selects an in-memory store; anything else is a file path.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            ":memory:" => DatabaseLocation::InMemory,
            path => DatabaseLocation::File(PathBuf::from(path)),
        }
    }

    /// `<cache dir>/mlb-pitchers/pitchers.db`
    pub fn default_file() -> Result<Self> {
        let cache_dir = cache_dir().ok_or_else(|| {
            PitchError::config("could not determine cache directory; set MLB_PITCHERS_DB_PATH")
        })?;
        Ok(DatabaseLocation::File(
            cache_dir.join("mlb-pitchers").join("pitchers.db"),
        ))
    }
}

/// Local relational store for pitchers, appearances, pitch events, sync
/// state and cached metrics.
///
/// The connection sits behind a mutex that is held for one call at a time,
/// so a `Repository` can be shared across tasks behind an `Arc`.
pub struct Repository {
    conn: Mutex<Connection>,
}

impl Repository {
    /// Open (creating if needed) the store at `location` and ensure tables exist.
    pub fn open(location: &DatabaseLocation) -> Result<Self> {
        let conn = match location {
            DatabaseLocation::File(path) => {
                ensure_parent_dir(path)?;
                debug!(path = %path.display(), "opening pitcher database");
                Connection::open(path)?
            }
            DatabaseLocation::InMemory => Connection::open_in_memory()?,
        };
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(&DatabaseLocation::InMemory)
    }

    pub(crate) fn from_connection(conn: Connection) -> Result<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection for the duration of one repository call.
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| PitchError::StoreUnavailable {
            message: "database connection lock poisoned".to_string(),
        })
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Initialize the database schema
pub(crate) fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS pitchers (
            pitcher_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            throws TEXT,
            data_version INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS pitcher_teams (
            pitcher_id INTEGER NOT NULL,
            season INTEGER NOT NULL,
            team TEXT NOT NULL,
            PRIMARY KEY (pitcher_id, season, team),
            FOREIGN KEY (pitcher_id) REFERENCES pitchers(pitcher_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS games (
            game_id INTEGER PRIMARY KEY,
            game_date TEXT NOT NULL,
            season INTEGER NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            is_final INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS appearances (
            appearance_id INTEGER PRIMARY KEY AUTOINCREMENT,
            pitcher_id INTEGER NOT NULL,
            game_id INTEGER NOT NULL,
            game_date TEXT NOT NULL,
            season INTEGER NOT NULL,
            team TEXT NOT NULL,
            outs INTEGER NOT NULL,
            runs INTEGER NOT NULL,
            earned_runs INTEGER NOT NULL,
            hits INTEGER NOT NULL,
            walks INTEGER NOT NULL,
            hit_by_pitch INTEGER NOT NULL,
            strikeouts INTEGER NOT NULL,
            home_runs INTEGER NOT NULL,
            batters_faced INTEGER NOT NULL,
            is_final INTEGER NOT NULL,
            synced_at INTEGER NOT NULL,
            UNIQUE (pitcher_id, game_id),
            FOREIGN KEY (pitcher_id) REFERENCES pitchers(pitcher_id),
            FOREIGN KEY (game_id) REFERENCES games(game_id)
        );

        CREATE INDEX IF NOT EXISTS idx_appearances_pitcher_date
            ON appearances(pitcher_id, game_date);

        CREATE INDEX IF NOT EXISTS idx_appearances_team_date
            ON appearances(team, game_date);

        CREATE TABLE IF NOT EXISTS pitch_events (
            appearance_id INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            pitch_type TEXT,
            release_speed REAL,
            spin_rate REAL,
            pfx_x REAL,
            pfx_z REAL,
            plate_x REAL,
            plate_z REAL,
            zone INTEGER,
            outcome TEXT NOT NULL,
            PRIMARY KEY (appearance_id, seq),
            FOREIGN KEY (appearance_id) REFERENCES appearances(appearance_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS sync_state (
            team TEXT NOT NULL,
            season INTEGER NOT NULL,
            status TEXT NOT NULL,
            last_synced_at INTEGER,
            fetched_start TEXT,
            fetched_end TEXT,
            last_error TEXT,
            PRIMARY KEY (team, season)
        );

        CREATE TABLE IF NOT EXISTS derived_metrics (
            pitcher_id INTEGER NOT NULL,
            range_start TEXT NOT NULL,
            range_end TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            payload TEXT NOT NULL,
            computed_at INTEGER NOT NULL,
            PRIMARY KEY (pitcher_id, range_start, range_end),
            FOREIGN KEY (pitcher_id) REFERENCES pitchers(pitcher_id) ON DELETE CASCADE
        );",
    )?;
    Ok(())
}
