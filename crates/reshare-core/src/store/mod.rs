//! SQLite persistence for identities, quota readings and usage increments.
//!
//! A single connection behind a mutex is the only writer; every multi-row
//! write runs inside one transaction so readers never see half an increment.

mod identities;
mod increments;
mod quota;
mod rollup;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

pub use rollup::DailyShare;

/// SQLite-backed store
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

impl Store {
    /// Open (or create) the database at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        schema::apply_pragmas(&conn)?;
        schema::migrate(&conn)?;
        debug!(path = %path.display(), "Opened resource database");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file location, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Per-agent activity for one UTC day, read by the status view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentActivity {
    pub name: String,
    pub model: Option<String>,
    pub collaborative_preference_percent: u8,
    /// Sum of normalized usage from autonomy increments
    pub autonomous_usage: f64,
    /// Sum of normalized usage from collaboration increments
    pub collaborative_usage: f64,
    /// Most recent autonomy increment, any day
    pub last_autonomy: Option<LastPrompt>,
}

/// When an agent last acted on its own, and the wait it was given
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LastPrompt {
    pub at: DateTime<Utc>,
    pub recommended_interval: u32,
}

impl LastPrompt {
    /// When the next autonomous prompt is due
    pub fn next_due(&self) -> DateTime<Utc> {
        self.at + chrono::Duration::seconds(i64::from(self.recommended_interval))
    }
}

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("timestamp {raw:?}: {e}")))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| Error::Corrupt(format!("date {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("resources.db");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resources.db");
        {
            let store = Store::open(&path).unwrap();
            let identity = crate::identity::AgentIdentity::new("Sparkle-Orange", 3.0, 20).unwrap();
            store.upsert_identity(&identity, Utc::now()).unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.list_identities().unwrap().len(), 1);
    }

    #[test]
    fn test_timestamp_format_round_trip() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 12, 30, 5).unwrap();
        let raw = format_timestamp(at);
        assert_eq!(raw, "2026-03-04T12:30:05Z");
        assert_eq!(parse_timestamp(&raw).unwrap(), at);
        assert!(matches!(parse_timestamp("yesterday"), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_last_prompt_next_due() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap();
        let last = LastPrompt {
            at,
            recommended_interval: 1800,
        };
        assert_eq!(last.next_due(), at + chrono::Duration::minutes(30));
    }
}
