//! Derived-metric cache rows
//!
//! Rows are keyed by (pitcher, range start, range end) and carry a
//! fingerprint of the inputs they were computed from. Appearance writes
//! delete every row whose range contains the written game date.

use super::queries::now_epoch;
use super::{models::DerivedMetricRow, schema::Repository};
use crate::cli::types::{DateRange, PitcherId};
use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

impl Repository {
    pub fn derived_metrics(
        &self,
        pitcher_id: PitcherId,
        range: &DateRange,
    ) -> Result<Option<DerivedMetricRow>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT fingerprint, payload, computed_at FROM derived_metrics
                 WHERE pitcher_id = ?1 AND range_start = ?2 AND range_end = ?3",
                params![pitcher_id.as_u32(), range.start(), range.end()],
                |row| {
                    Ok(DerivedMetricRow {
                        pitcher_id,
                        range: *range,
                        fingerprint: row.get(0)?,
                        payload: row.get(1)?,
                        computed_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn put_derived_metrics(
        &self,
        pitcher_id: PitcherId,
        range: &DateRange,
        fingerprint: &str,
        payload: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO derived_metrics
             (pitcher_id, range_start, range_end, fingerprint, payload, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                pitcher_id.as_u32(),
                range.start(),
                range.end(),
                fingerprint,
                payload,
                now_epoch()
            ],
        )?;
        Ok(())
    }

    /// Drop cached rows for `pitcher_id` whose range contains `date`.
    pub fn invalidate_derived_metrics(
        &self,
        pitcher_id: PitcherId,
        date: NaiveDate,
    ) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM derived_metrics
             WHERE pitcher_id = ?1 AND range_start <= ?2 AND range_end >= ?2",
            params![pitcher_id.as_u32(), date],
        )?;
        Ok(removed)
    }
}
