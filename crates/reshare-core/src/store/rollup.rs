//! Daily token rollups rebuilt from the increment log.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use tracing::info;

use crate::error::Result;

use super::{format_date, format_timestamp, parse_date, Store};

/// One agent's token totals for one UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyShare {
    pub claude_name: String,
    pub date: NaiveDate,
    pub autonomous_tokens: u64,
    pub collaborative_tokens: u64,
    pub total_tokens: u64,
    pub last_updated: String,
}

const SHARE_COLUMNS: &str = "claude_name, date, autonomous_tokens, collaborative_tokens, \
                             total_tokens, last_updated";

fn share_row(row: &Row<'_>) -> rusqlite::Result<(String, String, i64, i64, i64, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_share(raw: (String, String, i64, i64, i64, String)) -> Result<DailyShare> {
    let (claude_name, date, autonomous, collaborative, total, last_updated) = raw;
    Ok(DailyShare {
        claude_name,
        date: parse_date(&date)?,
        autonomous_tokens: autonomous.max(0) as u64,
        collaborative_tokens: collaborative.max(0) as u64,
        total_tokens: total.max(0) as u64,
        last_updated,
    })
}

impl Store {
    /// Totals for one agent on one day
    pub fn daily_share(&self, name: &str, date: NaiveDate) -> Result<Option<DailyShare>> {
        let raw = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {SHARE_COLUMNS} FROM daily_resource_share
                         WHERE claude_name = ?1 AND date = ?2"
                    ),
                    params![name, format_date(date)],
                    share_row,
                )
                .optional()?)
        })?;
        raw.map(into_share).transpose()
    }

    /// Totals for every agent on one day, busiest first
    pub fn daily_summary(&self, date: NaiveDate) -> Result<Vec<DailyShare>> {
        let raw = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SHARE_COLUMNS} FROM daily_resource_share
                 WHERE date = ?1
                 ORDER BY total_tokens DESC, claude_name"
            ))?;
            let rows = stmt.query_map([format_date(date)], share_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        raw.into_iter().map(into_share).collect()
    }

    /// Rebuild the daily totals for `date` from the increment log.
    ///
    /// Totals for agents with increments that day are replaced; rows for
    /// other agents are left alone. Rebuilt rows are stamped with `now`.
    /// Returns the number of agents rolled up.
    pub fn aggregate_day(&self, date: NaiveDate, now: DateTime<Utc>) -> Result<usize> {
        let day = format_date(date);
        let updated_at = format_timestamp(now);
        let agents = self.with_tx(|tx| {
            let changed = tx.execute(
                "INSERT INTO daily_resource_share
                    (claude_name, date, autonomous_tokens, collaborative_tokens, last_updated)
                 SELECT
                    claude_name,
                    ?1,
                    COALESCE(SUM(CASE WHEN mode = 'autonomy' THEN cache_read_increment END), 0),
                    COALESCE(SUM(CASE WHEN mode = 'collaboration' THEN cache_read_increment END), 0),
                    ?2
                 FROM resource_share_increments
                 WHERE substr(timestamp, 1, 10) = ?1
                 GROUP BY claude_name
                 ON CONFLICT(claude_name, date) DO UPDATE SET
                    autonomous_tokens = excluded.autonomous_tokens,
                    collaborative_tokens = excluded.collaborative_tokens,
                    last_updated = excluded.last_updated",
                params![day, updated_at],
            )?;
            Ok(changed)
        })?;
        info!("Aggregated {} agent(s) for {}", agents, day);
        Ok(agents)
    }
}
