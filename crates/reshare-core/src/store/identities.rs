//! Agent identity registry: cost multipliers and collaboration preferences.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::error::Result;
use crate::identity::AgentIdentity;
use crate::providers::IdentityRegistry;

use super::{format_timestamp, Store};

const IDENTITY_COLUMNS: &str = "name, model, cost_multiplier, collaborative_pref, active";

fn identity_from_row(row: &Row<'_>) -> rusqlite::Result<AgentIdentity> {
    Ok(AgentIdentity {
        name: row.get(0)?,
        model: row.get(1)?,
        cost_multiplier: row.get(2)?,
        collaborative_preference_percent: row.get(3)?,
        active: row.get(4)?,
    })
}

impl Store {
    /// Register an agent or replace its settings, stamping `updated_at`
    pub fn upsert_identity(
        &self,
        identity: &AgentIdentity,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        identity.validate()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO claude_identities
                    (name, model, cost_multiplier, collaborative_pref, active, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(name) DO UPDATE SET
                    model = excluded.model,
                    cost_multiplier = excluded.cost_multiplier,
                    collaborative_pref = excluded.collaborative_pref,
                    active = excluded.active,
                    updated_at = excluded.updated_at",
                params![
                    identity.name,
                    identity.model,
                    identity.cost_multiplier,
                    identity.collaborative_preference_percent,
                    identity.active,
                    format_timestamp(updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Every registered agent, active or not, by name
    pub fn list_identities(&self) -> Result<Vec<AgentIdentity>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {IDENTITY_COLUMNS} FROM claude_identities ORDER BY name"
            ))?;
            let rows = stmt.query_map([], identity_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Active agents only, by name
    pub fn active_identities(&self) -> Result<Vec<AgentIdentity>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {IDENTITY_COLUMNS} FROM claude_identities WHERE active = 1 ORDER BY name"
            ))?;
            let rows = stmt.query_map([], identity_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Number of registered agents, active or not
    pub fn count_identities(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM claude_identities",
                [],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }
}

impl IdentityRegistry for Store {
    fn agent_identity(&self, name: &str) -> Result<Option<AgentIdentity>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {IDENTITY_COLUMNS} FROM claude_identities WHERE name = ?1"),
                    [name],
                    identity_from_row,
                )
                .optional()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()
    }

    fn stored_updated_at(store: &Store, name: &str) -> String {
        store
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT updated_at FROM claude_identities WHERE name = ?1",
                    [name],
                    |row| row.get(0),
                )?)
            })
            .unwrap()
    }

    fn identity(name: &str, multiplier: f64, pref: u8) -> AgentIdentity {
        AgentIdentity::new(name, multiplier, pref).unwrap()
    }

    #[test]
    fn test_upsert_and_lookup() {
        let store = Store::open_in_memory().unwrap();
        let sparkle = identity("Sparkle-Orange", 3.0, 20).with_model("sonnet");
        store.upsert_identity(&sparkle, now()).unwrap();

        assert_eq!(
            store.agent_identity("Sparkle-Orange").unwrap(),
            Some(sparkle)
        );
        assert_eq!(store.agent_identity("Nobody").unwrap(), None);
    }

    #[test]
    fn test_upsert_replaces_settings() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_identity(&identity("Quill-Blue", 3.0, 20), now())
            .unwrap();
        store
            .upsert_identity(&identity("Quill-Blue", 15.0, 50), now())
            .unwrap();

        let stored = store.agent_identity("Quill-Blue").unwrap().unwrap();
        assert_eq!(stored.cost_multiplier, 15.0);
        assert_eq!(stored.collaborative_preference_percent, 50);
        assert_eq!(store.list_identities().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_invalid_identity() {
        let store = Store::open_in_memory().unwrap();
        let mut bad = identity("Quill-Blue", 3.0, 20);
        bad.cost_multiplier = 0.0;
        assert!(store.upsert_identity(&bad, now()).is_err());
        assert!(store.list_identities().unwrap().is_empty());
    }

    #[test]
    fn test_active_filter_and_count() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_identity(&identity("b-agent", 3.0, 0), now()).unwrap();
        store.upsert_identity(&identity("a-agent", 1.0, 0), now()).unwrap();
        let mut retired = identity("c-agent", 3.0, 0);
        retired.active = false;
        store.upsert_identity(&retired, now()).unwrap();

        let names: Vec<String> = store
            .active_identities()
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["a-agent", "b-agent"]);
        assert_eq!(store.count_identities().unwrap(), 3);
        assert_eq!(store.list_identities().unwrap().len(), 3);
    }

    #[test]
    fn test_upsert_stamps_given_time() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_identity(&identity("Quill-Blue", 3.0, 20), now())
            .unwrap();
        assert_eq!(stored_updated_at(&store, "Quill-Blue"), "2026-03-04T12:00:00Z");

        let later = now() + Duration::hours(2);
        store
            .upsert_identity(&identity("Quill-Blue", 15.0, 50), later)
            .unwrap();
        assert_eq!(stored_updated_at(&store, "Quill-Blue"), "2026-03-04T14:00:00Z");
    }
}
