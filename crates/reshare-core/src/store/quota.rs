//! Quota meter readings: ingestion and the latest-snapshot lookup.

use rusqlite::{params, OptionalExtension};

use crate::error::Result;
use crate::providers::QuotaSnapshotProvider;
use crate::quota::QuotaSnapshot;

use super::{format_timestamp, parse_timestamp, Store};

impl Store {
    /// Store a quota reading. Percentages are clamped to 0-100 first.
    pub fn insert_quota_snapshot(&self, snapshot: &QuotaSnapshot) -> Result<i64> {
        let snapshot = snapshot.clone().normalized();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO quota_info
                    (timestamp, session_5hour, week_all, week_sonnet,
                     session_5hour_reset, week_reset)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    format_timestamp(snapshot.observed_at),
                    snapshot.session_percent_used,
                    snapshot.week_percent_used,
                    snapshot.week_sonnet_percent_used,
                    snapshot.session_reset,
                    snapshot.week_reset,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }
}

impl QuotaSnapshotProvider for Store {
    fn latest_quota_snapshot(&self) -> Result<Option<QuotaSnapshot>> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT timestamp, session_5hour, week_all, week_sonnet,
                            session_5hour_reset, week_reset
                     FROM quota_info
                     ORDER BY timestamp DESC, id DESC
                     LIMIT 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, Option<i64>>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                        ))
                    },
                )
                .optional()?)
        })?;

        let Some((observed, session, week, sonnet, session_reset, week_reset)) = row else {
            return Ok(None);
        };
        Ok(Some(QuotaSnapshot {
            session_percent_used: clamp_percent(session),
            week_percent_used: clamp_percent(week),
            week_sonnet_percent_used: sonnet.map(clamp_percent),
            session_reset,
            week_reset,
            observed_at: parse_timestamp(&observed)?,
        }))
    }
}

fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}
