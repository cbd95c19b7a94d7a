//! Usage increments: the atomic record path and the windowed history reads.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use crate::allocation::Recommendation;
use crate::error::{Error, Result};
use crate::providers::{UsageHistoryProvider, UsageRecorder};
use crate::usage::{NormalizedIncrement, UsageHistory, UsageIncrement, UsageMode};

use super::{format_date, format_timestamp, parse_timestamp, AgentActivity, LastPrompt, Store};

impl UsageRecorder for Store {
    fn record_increment(
        &self,
        increment: &UsageIncrement,
        current_interval: u32,
        recommendation: &Recommendation,
        now: DateTime<Utc>,
    ) -> Result<NormalizedIncrement> {
        increment.validate()?;
        let recommendation_json = serde_json::to_string(recommendation)?;
        let timestamp = format_timestamp(now);
        let date = format_date(now.date_naive());

        self.with_tx(|tx| {
            let multiplier: Option<f64> = tx
                .query_row(
                    "SELECT cost_multiplier FROM claude_identities WHERE name = ?1",
                    [&increment.claude_name],
                    |row| row.get(0),
                )
                .optional()?;
            let metrics = increment.normalize(multiplier);
            let tokens = i64::try_from(metrics.cache_read_increment).unwrap_or(i64::MAX);
            let weighted = i64::try_from(metrics.weighted_cost).unwrap_or(i64::MAX);

            tx.execute(
                "INSERT INTO resource_share_increments
                    (timestamp, claude_name, mode, cache_read_increment, context_percentage,
                     weighted_cost, cost_delta, normalized_usage, current_interval,
                     recommended_interval, recommendation)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    timestamp,
                    increment.claude_name,
                    increment.mode.as_str(),
                    tokens,
                    increment.context_percentage,
                    weighted,
                    metrics.cost_delta,
                    metrics.normalized_usage,
                    current_interval,
                    recommendation.interval_seconds,
                    recommendation_json,
                ],
            )?;

            let (autonomous, collaborative) = match increment.mode {
                UsageMode::Autonomy => (tokens, 0),
                UsageMode::Collaboration => (0, tokens),
            };
            tx.execute(
                "INSERT INTO daily_resource_share
                    (claude_name, date, autonomous_tokens, collaborative_tokens, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(claude_name, date) DO UPDATE SET
                    autonomous_tokens = autonomous_tokens + excluded.autonomous_tokens,
                    collaborative_tokens = collaborative_tokens + excluded.collaborative_tokens,
                    last_updated = excluded.last_updated",
                params![increment.claude_name, date, autonomous, collaborative, timestamp],
            )?;

            Ok(metrics)
        })
    }
}

impl UsageHistoryProvider for Store {
    /// Sum of normalized usage per active agent since `now - window_hours`.
    ///
    /// Increments from unregistered or inactive agents are left out so they
    /// cannot become the fairness baseline.
    fn recent_weighted_usage(
        &self,
        window_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<UsageHistory> {
        let start = now
            .checked_sub_signed(Duration::hours(i64::from(window_hours)))
            .ok_or_else(|| {
                Error::InvalidInput(format!("usage window of {window_hours}h is out of range"))
            })?;
        let since = format_timestamp(start);
        let until = format_timestamp(now);
        let names: Vec<String> = self
            .active_identities()?
            .into_iter()
            .map(|identity| identity.name)
            .collect();
        let mut history = UsageHistory::with_agents(names);

        let sums = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT claude_name, SUM(normalized_usage)
                 FROM resource_share_increments
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 GROUP BY claude_name",
            )?;
            let rows = stmt.query_map(params![since, until], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;

        for (name, usage) in sums {
            if history.contains(&name) {
                history.set(name, usage);
            }
        }
        Ok(history)
    }
}

impl Store {
    /// Most recent autonomy increment for an agent
    pub fn last_autonomy_prompt(&self, name: &str) -> Result<Option<LastPrompt>> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT timestamp, recommended_interval
                     FROM resource_share_increments
                     WHERE claude_name = ?1 AND mode = 'autonomy'
                     ORDER BY timestamp DESC, id DESC
                     LIMIT 1",
                    [name],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)),
                )
                .optional()?)
        })?;
        row.map(|(at, recommended_interval)| {
            Ok(LastPrompt {
                at: parse_timestamp(&at)?,
                recommended_interval,
            })
        })
        .transpose()
    }

    /// Today's per-mode normalized usage and last prompt for every active
    /// agent
    pub fn agent_activity(&self, date: NaiveDate) -> Result<Vec<AgentActivity>> {
        let date = format_date(date);
        let mut activity = Vec::new();
        for identity in self.active_identities()? {
            let (autonomous_usage, collaborative_usage) = self.with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT
                        COALESCE(SUM(CASE WHEN mode = 'autonomy' THEN normalized_usage END), 0),
                        COALESCE(SUM(CASE WHEN mode = 'collaboration' THEN normalized_usage END), 0)
                     FROM resource_share_increments
                     WHERE claude_name = ?1 AND substr(timestamp, 1, 10) = ?2",
                    params![identity.name, date],
                    |row| Ok((row.get::<_, f64>(0)?, row.get::<_, f64>(1)?)),
                )?)
            })?;
            let last_autonomy = self.last_autonomy_prompt(&identity.name)?;
            activity.push(AgentActivity {
                name: identity.name,
                model: identity.model,
                collaborative_preference_percent: identity.collaborative_preference_percent,
                autonomous_usage,
                collaborative_usage,
                last_autonomy,
            });
        }
        Ok(activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::Multipliers;
    use crate::identity::AgentIdentity;
    use crate::quota::QuotaStatus;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()
    }

    fn recommendation(interval: u32) -> Recommendation {
        Recommendation {
            interval_seconds: interval,
            multipliers: Multipliers::neutral(),
            reasons: vec!["Fairness: no usage recorded yet".to_string()],
            quota_status: QuotaStatus::Good,
        }
    }

    fn cost(name: &str, mode: UsageMode, cost: f64) -> UsageIncrement {
        UsageIncrement {
            claude_name: name.to_string(),
            mode,
            cost_delta: Some(cost),
            cache_read_increment: None,
            context_percentage: Some(42.0),
            current_interval: None,
        }
    }

    fn store_with_agents() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_identity(&AgentIdentity::new("Sparkle-Orange", 3.0, 20).unwrap(), now())
            .unwrap();
        store
            .upsert_identity(&AgentIdentity::new("Quill-Blue", 15.0, 50).unwrap(), now())
            .unwrap();
        store
    }

    #[test]
    fn test_record_uses_identity_multiplier() {
        let store = store_with_agents();
        let metrics = store
            .record_increment(
                &cost("Quill-Blue", UsageMode::Autonomy, 1.5),
                1800,
                &recommendation(2400),
                now(),
            )
            .unwrap();
        assert!((metrics.normalized_usage - 0.1).abs() < 1e-12);
        assert_eq!(metrics.cache_read_increment, 100);
    }

    #[test]
    fn test_record_unknown_agent_uses_default_multiplier() {
        let store = store_with_agents();
        let metrics = store
            .record_increment(
                &cost("Stranger", UsageMode::Autonomy, 0.3),
                1800,
                &recommendation(1800),
                now(),
            )
            .unwrap();
        assert!((metrics.normalized_usage - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_record_updates_daily_totals() {
        let store = store_with_agents();
        let rec = recommendation(1800);
        store
            .record_increment(&cost("Sparkle-Orange", UsageMode::Autonomy, 1.5), 1800, &rec, now())
            .unwrap();
        store
            .record_increment(&cost("Sparkle-Orange", UsageMode::Autonomy, 3.0), 1800, &rec, now())
            .unwrap();
        store
            .record_increment(
                &cost("Sparkle-Orange", UsageMode::Collaboration, 0.75),
                1800,
                &rec,
                now(),
            )
            .unwrap();

        let share = store
            .daily_share("Sparkle-Orange", now().date_naive())
            .unwrap()
            .unwrap();
        assert_eq!(share.autonomous_tokens, 1500);
        assert_eq!(share.collaborative_tokens, 250);
        assert_eq!(share.total_tokens, 1750);
    }

    #[test]
    fn test_recent_usage_lists_every_active_agent() {
        let store = store_with_agents();
        let rec = recommendation(1800);
        store
            .record_increment(&cost("Sparkle-Orange", UsageMode::Autonomy, 0.6), 1800, &rec, now())
            .unwrap();
        // Outside a 24h window
        store
            .record_increment(
                &cost("Quill-Blue", UsageMode::Autonomy, 3.0),
                1800,
                &rec,
                now() - Duration::hours(30),
            )
            .unwrap();
        // Unregistered agents never become the baseline
        store
            .record_increment(&cost("Stranger", UsageMode::Autonomy, 0.03), 1800, &rec, now())
            .unwrap();

        let history = store.recent_weighted_usage(24, now()).unwrap();
        assert_eq!(history.len(), 2);
        assert!((history.get("Sparkle-Orange") - 0.2).abs() < 1e-12);
        assert_eq!(history.get("Quill-Blue"), 0.0);
        assert!(!history.contains("Stranger"));

        let wide = store.recent_weighted_usage(48, now()).unwrap();
        assert!((wide.get("Quill-Blue") - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_recent_usage_rejects_window_beyond_calendar_range() {
        let store = store_with_agents();
        let err = store.recent_weighted_usage(u32::MAX, now()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "got {err:?}");
    }

    #[test]
    fn test_last_autonomy_prompt_ignores_collaboration() {
        let store = store_with_agents();
        store
            .record_increment(
                &cost("Sparkle-Orange", UsageMode::Autonomy, 0.3),
                1800,
                &recommendation(2400),
                now() - Duration::minutes(20),
            )
            .unwrap();
        store
            .record_increment(
                &cost("Sparkle-Orange", UsageMode::Collaboration, 0.3),
                1800,
                &recommendation(900),
                now(),
            )
            .unwrap();

        let last = store.last_autonomy_prompt("Sparkle-Orange").unwrap().unwrap();
        assert_eq!(last.at, now() - Duration::minutes(20));
        assert_eq!(last.recommended_interval, 2400);
        assert_eq!(store.last_autonomy_prompt("Quill-Blue").unwrap(), None);
    }

    #[test]
    fn test_agent_activity_for_today() {
        let store = store_with_agents();
        let rec = recommendation(1800);
        store
            .record_increment(&cost("Sparkle-Orange", UsageMode::Autonomy, 0.3), 1800, &rec, now())
            .unwrap();
        store
            .record_increment(
                &cost("Sparkle-Orange", UsageMode::Collaboration, 0.9),
                1800,
                &rec,
                now(),
            )
            .unwrap();
        store
            .record_increment(
                &cost("Sparkle-Orange", UsageMode::Autonomy, 3.0),
                1800,
                &rec,
                now() - Duration::days(1),
            )
            .unwrap();

        let activity = store.agent_activity(now().date_naive()).unwrap();
        assert_eq!(activity.len(), 2);
        let quill = &activity[0];
        assert_eq!(quill.name, "Quill-Blue");
        assert_eq!(quill.autonomous_usage, 0.0);
        assert_eq!(quill.last_autonomy, None);

        let sparkle = &activity[1];
        assert!((sparkle.autonomous_usage - 0.1).abs() < 1e-12);
        assert!((sparkle.collaborative_usage - 0.3).abs() < 1e-12);
        assert_eq!(sparkle.collaborative_preference_percent, 20);
        assert_eq!(sparkle.last_autonomy.unwrap().at, now());
    }
}
