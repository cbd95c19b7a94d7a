//! Schema creation and connection pragmas.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Current schema version, tracked in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Apply per-connection pragmas: WAL, NORMAL sync, 5s busy timeout.
pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

/// Bring the schema up to [`SCHEMA_VERSION`]. Safe to run on every open.
pub fn migrate(conn: &Connection) -> Result<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    info!("Creating resource tracking schema v{}", SCHEMA_VERSION);
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS claude_identities (
            name               TEXT PRIMARY KEY,
            model              TEXT,
            cost_multiplier    REAL NOT NULL DEFAULT 3,
            collaborative_pref INTEGER NOT NULL DEFAULT 0,
            active             INTEGER NOT NULL DEFAULT 1,
            updated_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS quota_info (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp           TEXT NOT NULL,
            session_5hour       INTEGER NOT NULL,
            week_all            INTEGER NOT NULL,
            week_sonnet         INTEGER,
            session_5hour_reset TEXT,
            week_reset          TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_quota_timestamp ON quota_info(timestamp);

        CREATE TABLE IF NOT EXISTS resource_share_increments (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp            TEXT NOT NULL,
            claude_name          TEXT NOT NULL,
            mode                 TEXT NOT NULL CHECK (mode IN ('autonomy', 'collaboration')),
            cache_read_increment INTEGER NOT NULL DEFAULT 0,
            context_percentage   REAL,
            weighted_cost        INTEGER NOT NULL DEFAULT 0,
            cost_delta           REAL NOT NULL DEFAULT 0,
            normalized_usage     REAL NOT NULL DEFAULT 0,
            current_interval     INTEGER,
            recommended_interval INTEGER NOT NULL,
            recommendation       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_increments_timestamp
            ON resource_share_increments(timestamp);
        CREATE INDEX IF NOT EXISTS idx_increments_agent_timestamp
            ON resource_share_increments(claude_name, timestamp);

        CREATE TABLE IF NOT EXISTS daily_resource_share (
            claude_name          TEXT NOT NULL,
            date                 TEXT NOT NULL,
            autonomous_tokens    INTEGER NOT NULL DEFAULT 0,
            collaborative_tokens INTEGER NOT NULL DEFAULT 0,
            total_tokens         INTEGER GENERATED ALWAYS AS
                                     (autonomous_tokens + collaborative_tokens) VIRTUAL,
            last_updated         TEXT NOT NULL,
            PRIMARY KEY (claude_name, date)
        );
        ",
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
