//! Pitcher, game and appearance read/write operations

use super::{models::*, schema::Repository};
use crate::cli::types::{DateRange, GameId, PitcherId, Season, TeamCode};
use crate::error::{PitchError, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql, Transaction};
use std::str::FromStr;

const APPEARANCE_COLUMNS: &str = "a.pitcher_id, a.game_id, a.game_date, a.season, a.team,
     a.outs, a.runs, a.earned_runs, a.hits, a.walks, a.hit_by_pitch, a.strikeouts,
     a.home_runs, a.batters_faced, a.is_final, a.synced_at";

pub(crate) fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

pub(crate) fn game_key(id: GameId) -> i64 {
    id.as_u64() as i64
}

/// Parse a text column into a domain type, surfacing failures as rusqlite
/// conversion errors so they can be raised from inside row mappers.
pub(crate) fn parse_column<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: FromStr<Err = PitchError>,
{
    raw.parse().map_err(|e: PitchError| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

impl Repository {
    /// Insert or update a pitcher's identity and record the team they
    /// pitched for in `season`.
    pub fn upsert_pitcher(
        &self,
        pitcher: &PitcherIdentity,
        team: &TeamCode,
        season: Season,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO pitchers (pitcher_id, name, throws) VALUES (?1, ?2, ?3)
             ON CONFLICT(pitcher_id) DO UPDATE SET
                name = excluded.name,
                throws = COALESCE(excluded.throws, pitchers.throws)",
            params![
                pitcher.id.as_u32(),
                pitcher.name,
                pitcher.throws.map(|h| h.as_str())
            ],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO pitcher_teams (pitcher_id, season, team) VALUES (?1, ?2, ?3)",
            params![pitcher.id.as_u32(), season.as_u16(), team.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Replace the appearance for (pitcher, game) together with its pitch
    /// events in one transaction.
    ///
    /// An existing final appearance is left untouched unless `force` is set.
    /// Any write also bumps the pitcher's data version and deletes cached
    /// metrics whose range contains the game date. The pitcher must already
    /// exist (see [`Repository::upsert_pitcher`]).
    pub fn replace_appearance(
        &self,
        game: &Game,
        record: &AppearanceRecord,
        force: bool,
    ) -> Result<ReplaceOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<(i64, bool)> = tx
            .query_row(
                "SELECT appearance_id, is_final FROM appearances
                 WHERE pitcher_id = ?1 AND game_id = ?2",
                params![record.pitcher.id.as_u32(), game_key(game.id)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let action = match existing {
            Some((_, true)) if !force => {
                return Ok(ReplaceOutcome {
                    action: ReplaceAction::Unchanged,
                    invalidated_metrics: 0,
                });
            }
            Some((appearance_id, _)) => {
                tx.execute(
                    "DELETE FROM pitch_events WHERE appearance_id = ?1",
                    params![appearance_id],
                )?;
                tx.execute(
                    "DELETE FROM appearances WHERE appearance_id = ?1",
                    params![appearance_id],
                )?;
                ReplaceAction::Replaced
            }
            None => ReplaceAction::Inserted,
        };

        upsert_game(&tx, game)?;
        let appearance_id = insert_appearance(&tx, game, record)?;
        insert_pitches(&tx, appearance_id, &record.pitches)?;

        tx.execute(
            "UPDATE pitchers SET data_version = data_version + 1 WHERE pitcher_id = ?1",
            params![record.pitcher.id.as_u32()],
        )?;
        let invalidated_metrics = tx.execute(
            "DELETE FROM derived_metrics
             WHERE pitcher_id = ?1 AND range_start <= ?2 AND range_end >= ?2",
            params![record.pitcher.id.as_u32(), game.date],
        )?;

        tx.commit()?;
        Ok(ReplaceOutcome {
            action,
            invalidated_metrics,
        })
    }

    /// Get a pitcher with their team/season history
    pub fn pitcher(&self, pitcher_id: PitcherId) -> Result<Option<Pitcher>> {
        let identity = {
            let conn = self.conn()?;
            let result = conn.query_row(
                "SELECT pitcher_id, name, throws FROM pitchers WHERE pitcher_id = ?1",
                params![pitcher_id.as_u32()],
                row_to_identity,
            );
            match result {
                Ok(identity) => identity,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        };

        let teams = self.pitcher_teams(pitcher_id)?;
        Ok(Some(Pitcher {
            id: identity.id,
            name: identity.name,
            throws: identity.throws,
            teams,
        }))
    }

    /// Teams a pitcher appeared for, ordered by season then team
    pub fn pitcher_teams(&self, pitcher_id: PitcherId) -> Result<Vec<TeamSeason>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT season, team FROM pitcher_teams
             WHERE pitcher_id = ?1
             ORDER BY season, team",
        )?;
        let rows = stmt.query_map(params![pitcher_id.as_u32()], |row| {
            Ok(TeamSeason {
                season: Season::new(row.get(0)?),
                team: parse_column(1, row.get(1)?)?,
            })
        })?;

        let mut teams = Vec::new();
        for row in rows {
            teams.push(row?);
        }
        Ok(teams)
    }

    /// Current data version of a pitcher; changes on every appearance write.
    pub fn pitcher_data_version(&self, pitcher_id: PitcherId) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let version = conn
            .query_row(
                "SELECT data_version FROM pitchers WHERE pitcher_id = ?1",
                params![pitcher_id.as_u32()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }

    /// Search pitchers by name substring, team and appearance date range.
    ///
    /// With a date range only pitchers who appeared inside it are returned.
    /// Results are ordered by name, then id.
    pub fn search_pitchers(&self, filter: &PitcherFilter) -> Result<Vec<PitcherSummary>> {
        let mut join = String::from("LEFT JOIN appearances a ON a.pitcher_id = p.pitcher_id");
        let mut join_params: Vec<Box<dyn ToSql>> = Vec::new();
        let mut clauses = String::from(" WHERE 1 = 1");
        let mut where_params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(range) = &filter.range {
            join.push_str(" AND a.game_date BETWEEN ? AND ?");
            join_params.push(Box::new(range.start()));
            join_params.push(Box::new(range.end()));
        }

        if let Some(team) = &filter.team {
            join.push_str(" AND a.team = ?");
            join_params.push(Box::new(team.as_str().to_string()));
            clauses.push_str(
                " AND EXISTS (SELECT 1 FROM pitcher_teams t
                              WHERE t.pitcher_id = p.pitcher_id AND t.team = ?)",
            );
            where_params.push(Box::new(team.as_str().to_string()));
        }

        if let Some(name) = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            clauses.push_str(" AND LOWER(p.name) LIKE ?");
            where_params.push(Box::new(format!("%{}%", name.to_lowercase())));
        }

        let mut query = format!(
            "SELECT p.pitcher_id, p.name, p.throws,
                    COUNT(a.appearance_id), MIN(a.game_date), MAX(a.game_date)
             FROM pitchers p {join}{clauses}
             GROUP BY p.pitcher_id, p.name, p.throws"
        );
        if filter.range.is_some() {
            query.push_str(" HAVING COUNT(a.appearance_id) > 0");
        }
        query.push_str(" ORDER BY p.name, p.pitcher_id");

        type SummaryRow = (
            PitcherIdentity,
            u32,
            Option<chrono::NaiveDate>,
            Option<chrono::NaiveDate>,
        );
        let rows: Vec<SummaryRow> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&query)?;
            let mapped = stmt.query_map(
                rusqlite::params_from_iter(
                    join_params.iter().chain(where_params.iter()).map(|p| p.as_ref()),
                ),
                |row| {
                    Ok((
                        row_to_identity(row)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )?;
            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row?);
            }
            rows
        };

        let mut summaries = Vec::with_capacity(rows.len());
        for (identity, appearances, first, last) in rows {
            let teams = self.pitcher_teams(identity.id)?;
            summaries.push(PitcherSummary {
                pitcher: Pitcher {
                    id: identity.id,
                    name: identity.name,
                    throws: identity.throws,
                    teams,
                },
                appearances,
                first_appearance: first,
                last_appearance: last,
            });
        }
        Ok(summaries)
    }

    /// Appearances for a pitcher ordered by date, then game
    pub fn appearances(
        &self,
        pitcher_id: PitcherId,
        range: Option<&DateRange>,
    ) -> Result<Vec<Appearance>> {
        let range = range.copied().unwrap_or_else(DateRange::unbounded);
        let conn = self.conn()?;
        select_appearances(&conn, pitcher_id, &range)
    }

    /// Appearances and pitch events for a pitcher from a single read
    /// transaction.
    pub fn pitching_snapshot(
        &self,
        pitcher_id: PitcherId,
        range: Option<&DateRange>,
    ) -> Result<PitchingSnapshot> {
        let range = range.copied().unwrap_or_else(DateRange::unbounded);
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let snapshot = PitchingSnapshot {
            appearances: select_appearances(&tx, pitcher_id, &range)?,
            events: select_pitch_events(&tx, pitcher_id, &range)?,
        };
        tx.commit()?;
        Ok(snapshot)
    }

    /// Appearances recorded for a team ordered by date, game, then pitcher
    pub fn team_appearances(
        &self,
        team: &TeamCode,
        range: Option<&DateRange>,
    ) -> Result<Vec<Appearance>> {
        let range = range.copied().unwrap_or_else(DateRange::unbounded);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {APPEARANCE_COLUMNS} FROM appearances a
             WHERE a.team = ?1 AND a.game_date BETWEEN ?2 AND ?3
             ORDER BY a.game_date, a.game_id, a.pitcher_id"
        ))?;
        let rows = stmt.query_map(
            params![team.as_str(), range.start(), range.end()],
            row_to_appearance,
        )?;

        let mut appearances = Vec::new();
        for row in rows {
            appearances.push(row?);
        }
        Ok(appearances)
    }

    /// Date of the earliest appearance for `team` within `range` that was
    /// stored before its game went final.
    pub fn earliest_open_appearance(
        &self,
        team: &TeamCode,
        range: &DateRange,
    ) -> Result<Option<chrono::NaiveDate>> {
        let conn = self.conn()?;
        let earliest = conn.query_row(
            "SELECT MIN(game_date) FROM appearances
             WHERE team = ?1 AND is_final = 0 AND game_date BETWEEN ?2 AND ?3",
            params![team.as_str(), range.start(), range.end()],
            |row| row.get(0),
        )?;
        Ok(earliest)
    }

    /// Pitch events for a pitcher in date, game, sequence order
    pub fn pitch_events(
        &self,
        pitcher_id: PitcherId,
        range: Option<&DateRange>,
    ) -> Result<Vec<PitchEvent>> {
        let range = range.copied().unwrap_or_else(DateRange::unbounded);
        let conn = self.conn()?;
        select_pitch_events(&conn, pitcher_id, &range)
    }

    /// Distinct teams with at least one recorded pitcher
    pub fn teams(&self) -> Result<Vec<TeamCode>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT team FROM pitcher_teams ORDER BY team")?;
        let rows = stmt.query_map([], |row| parse_column(0, row.get(0)?))?;

        let mut teams = Vec::new();
        for row in rows {
            teams.push(row?);
        }
        Ok(teams)
    }

    pub fn game(&self, game_id: GameId) -> Result<Option<Game>> {
        let conn = self.conn()?;
        let game = conn
            .query_row(
                "SELECT game_id, game_date, season, home_team, away_team, is_final
                 FROM games WHERE game_id = ?1",
                params![game_key(game_id)],
                |row| {
                    Ok(Game {
                        id: GameId::new(row.get::<_, i64>(0)? as u64),
                        date: row.get(1)?,
                        season: Season::new(row.get(2)?),
                        home_team: parse_column(3, row.get(3)?)?,
                        away_team: parse_column(4, row.get(4)?)?,
                        is_final: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(game)
    }

    /// Row counts per table
    pub fn counts(&self) -> Result<StoreCounts> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<u64> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
            Ok(n as u64)
        };
        Ok(StoreCounts {
            pitchers: count("pitchers")?,
            games: count("games")?,
            appearances: count("appearances")?,
            pitch_events: count("pitch_events")?,
            derived_metrics: count("derived_metrics")?,
        })
    }

    /// Clear all stored data, including sync state
    pub fn clear_all_data(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM derived_metrics;
             DELETE FROM pitch_events;
             DELETE FROM appearances;
             DELETE FROM games;
             DELETE FROM pitcher_teams;
             DELETE FROM pitchers;
             DELETE FROM sync_state;",
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn select_appearances(
    conn: &Connection,
    pitcher_id: PitcherId,
    range: &DateRange,
) -> Result<Vec<Appearance>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPEARANCE_COLUMNS} FROM appearances a
         WHERE a.pitcher_id = ?1 AND a.game_date BETWEEN ?2 AND ?3
         ORDER BY a.game_date, a.game_id"
    ))?;
    let rows = stmt.query_map(
        params![pitcher_id.as_u32(), range.start(), range.end()],
        row_to_appearance,
    )?;

    let mut appearances = Vec::new();
    for row in rows {
        appearances.push(row?);
    }
    Ok(appearances)
}

fn select_pitch_events(
    conn: &Connection,
    pitcher_id: PitcherId,
    range: &DateRange,
) -> Result<Vec<PitchEvent>> {
    let mut stmt = conn.prepare(
        "SELECT a.pitcher_id, a.game_id, a.game_date, e.seq, e.pitch_type,
                e.release_speed, e.spin_rate, e.pfx_x, e.pfx_z, e.plate_x, e.plate_z,
                e.zone, e.outcome
         FROM pitch_events e
         JOIN appearances a ON a.appearance_id = e.appearance_id
         WHERE a.pitcher_id = ?1 AND a.game_date BETWEEN ?2 AND ?3
         ORDER BY a.game_date, a.game_id, e.seq",
    )?;
    let rows = stmt.query_map(
        params![pitcher_id.as_u32(), range.start(), range.end()],
        |row| {
            Ok(PitchEvent {
                pitcher_id: PitcherId::new(row.get(0)?),
                game_id: GameId::new(row.get::<_, i64>(1)? as u64),
                game_date: row.get(2)?,
                seq: row.get(3)?,
                pitch: Pitch {
                    pitch_type: row.get(4)?,
                    release_speed: row.get(5)?,
                    spin_rate: row.get(6)?,
                    pfx_x: row.get(7)?,
                    pfx_z: row.get(8)?,
                    plate_x: row.get(9)?,
                    plate_z: row.get(10)?,
                    zone: row.get(11)?,
                    outcome: parse_column(12, row.get(12)?)?,
                },
            })
        },
    )?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

fn upsert_game(tx: &Transaction<'_>, game: &Game) -> Result<()> {
    tx.execute(
        "INSERT INTO games (game_id, game_date, season, home_team, away_team, is_final)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(game_id) DO UPDATE SET
            game_date = excluded.game_date,
            season = excluded.season,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            is_final = excluded.is_final",
        params![
            game_key(game.id),
            game.date,
            game.season.as_u16(),
            game.home_team.as_str(),
            game.away_team.as_str(),
            game.is_final
        ],
    )?;
    Ok(())
}

fn insert_appearance(tx: &Transaction<'_>, game: &Game, record: &AppearanceRecord) -> Result<i64> {
    let line = &record.line;
    tx.execute(
        "INSERT INTO appearances
         (pitcher_id, game_id, game_date, season, team, outs, runs, earned_runs, hits, walks,
          hit_by_pitch, strikeouts, home_runs, batters_faced, is_final, synced_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            record.pitcher.id.as_u32(),
            game_key(game.id),
            game.date,
            game.season.as_u16(),
            record.team.as_str(),
            line.outs,
            line.runs,
            line.earned_runs,
            line.hits,
            line.walks,
            line.hit_by_pitch,
            line.strikeouts,
            line.home_runs,
            line.batters_faced,
            game.is_final,
            now_epoch()
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

fn insert_pitches(tx: &Transaction<'_>, appearance_id: i64, pitches: &[Pitch]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO pitch_events
         (appearance_id, seq, pitch_type, release_speed, spin_rate, pfx_x, pfx_z,
          plate_x, plate_z, zone, outcome)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for (seq, pitch) in pitches.iter().enumerate() {
        stmt.execute(params![
            appearance_id,
            seq as u32 + 1,
            pitch.pitch_type,
            pitch.release_speed,
            pitch.spin_rate,
            pitch.pfx_x,
            pitch.pfx_z,
            pitch.plate_x,
            pitch.plate_z,
            pitch.zone,
            pitch.outcome.as_str()
        ])?;
    }
    Ok(())
}

fn row_to_identity(row: &Row) -> rusqlite::Result<PitcherIdentity> {
    let throws: Option<String> = row.get(2)?;
    Ok(PitcherIdentity {
        id: PitcherId::new(row.get(0)?),
        name: row.get(1)?,
        throws: throws.as_deref().and_then(Hand::from_code),
    })
}

fn row_to_appearance(row: &Row) -> rusqlite::Result<Appearance> {
    Ok(Appearance {
        pitcher_id: PitcherId::new(row.get(0)?),
        game_id: GameId::new(row.get::<_, i64>(1)? as u64),
        game_date: row.get(2)?,
        season: Season::new(row.get(3)?),
        team: parse_column(4, row.get(4)?)?,
        line: PitchingLine {
            outs: row.get(5)?,
            runs: row.get(6)?,
            earned_runs: row.get(7)?,
            hits: row.get(8)?,
            walks: row.get(9)?,
            hit_by_pitch: row.get(10)?,
            strikeouts: row.get(11)?,
            home_runs: row.get(12)?,
            batters_faced: row.get(13)?,
        },
        is_final: row.get(14)?,
        synced_at: row.get(15)?,
    })
}
