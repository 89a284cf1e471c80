//! Persistence of per-(team, season) sync state

use super::queries::parse_column;
use super::{models::*, schema::Repository};
use crate::cli::types::{DateRange, Season, TeamCode};
use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::{params, Row};

impl Repository {
    /// Stored state for a unit, or a never-synced state when none exists.
    pub fn sync_state(&self, unit: &SyncUnit) -> Result<SyncState> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT team, season, status, last_synced_at, fetched_start, fetched_end, last_error
             FROM sync_state WHERE team = ?1 AND season = ?2",
            params![unit.team.as_str(), unit.season.as_u16()],
            row_to_sync_state,
        );

        match result {
            Ok(state) => Ok(state),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(SyncState::never_synced(unit.clone())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn put_sync_state(&self, state: &SyncState) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_state
             (team, season, status, last_synced_at, fetched_start, fetched_end, last_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(team, season) DO UPDATE SET
                status = excluded.status,
                last_synced_at = excluded.last_synced_at,
                fetched_start = excluded.fetched_start,
                fetched_end = excluded.fetched_end,
                last_error = excluded.last_error",
            params![
                state.unit.team.as_str(),
                state.unit.season.as_u16(),
                state.status.as_str(),
                state.last_synced_at,
                state.fetched.map(|r| r.start()),
                state.fetched.map(|r| r.end()),
                state.last_error
            ],
        )?;
        Ok(())
    }

    /// All stored sync states, optionally limited to `teams`, ordered by
    /// team then season.
    pub fn sync_states(&self, teams: Option<&[TeamCode]>) -> Result<Vec<SyncState>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT team, season, status, last_synced_at, fetched_start, fetched_end, last_error
             FROM sync_state ORDER BY team, season",
        )?;
        let rows = stmt.query_map([], row_to_sync_state)?;

        let mut states = Vec::new();
        for row in rows {
            let state = row?;
            if teams.map_or(true, |teams| teams.contains(&state.unit.team)) {
                states.push(state);
            }
        }
        Ok(states)
    }
}

fn row_to_sync_state(row: &Row) -> rusqlite::Result<SyncState> {
    let team: TeamCode = parse_column(0, row.get(0)?)?;
    let season = Season::new(row.get(1)?);
    let fetched_start: Option<NaiveDate> = row.get(4)?;
    let fetched_end: Option<NaiveDate> = row.get(5)?;

    let fetched = match (fetched_start, fetched_end) {
        (Some(start), Some(end)) => DateRange::new(start, end).ok(),
        _ => None,
    };

    Ok(SyncState {
        unit: SyncUnit::new(team, season),
        status: parse_column(2, row.get(2)?)?,
        last_synced_at: row.get(3)?,
        fetched,
        last_error: row.get(6)?,
    })
}
