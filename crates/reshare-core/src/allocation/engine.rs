//! Combination of the fairness and pace multipliers into a recommendation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::AgentIdentity;
use crate::quota::{QuotaSnapshot, QuotaStatus, QuotaWindow};
use crate::usage::UsageHistory;

use super::config::AllocationConfig;
use super::fairness::fairness_multiplier;
use super::pace::window_pace;

/// The multipliers that produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
    pub fairness: f64,
    pub session: f64,
    pub week: f64,
    pub combined: f64,
}

impl Multipliers {
    /// All factors at 1.0
    pub fn neutral() -> Self {
        Self {
            fairness: 1.0,
            session: 1.0,
            week: 1.0,
            combined: 1.0,
        }
    }
}

/// Recommended wait before an agent's next autonomous action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Always within the configured interval bounds
    pub interval_seconds: u32,
    pub multipliers: Multipliers,
    /// Human-readable trail, fairness first, then session, week and the total
    pub reasons: Vec<String>,
    pub quota_status: QuotaStatus,
}

/// The allocation engine.
///
/// Pure: identical inputs (including `now`) give identical output, and it
/// never fails. Missing data degrades to neutral multipliers.
#[derive(Debug, Clone, Default)]
pub struct AllocationEngine {
    config: AllocationConfig,
}

impl AllocationEngine {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Recommend the next interval for `agent`.
    ///
    /// `current_interval` defaults to the configured default when absent.
    pub fn recommend(
        &self,
        agent: &str,
        current_interval: Option<u32>,
        snapshot: Option<&QuotaSnapshot>,
        identity: Option<&AgentIdentity>,
        history: &UsageHistory,
        now: DateTime<Utc>,
    ) -> Recommendation {
        let current = current_interval.unwrap_or(self.config.default_interval_secs);

        let snapshot = match snapshot {
            Some(s) => s,
            None => return self.unchanged(current, "No quota data available".to_string()),
        };
        let identity = match identity {
            Some(i) => i,
            None => {
                return self.unchanged(current, format!("Agent {agent} not found in registry"))
            }
        };

        let (fairness, fairness_reason) = fairness_multiplier(agent, history, &self.config);
        let preference = identity.collaborative_preference_percent;
        let session = window_pace(
            QuotaWindow::Session,
            snapshot.percent_used(QuotaWindow::Session),
            snapshot.reset(QuotaWindow::Session),
            preference,
            now,
            &self.config,
        );
        let week = window_pace(
            QuotaWindow::Week,
            snapshot.percent_used(QuotaWindow::Week),
            snapshot.reset(QuotaWindow::Week),
            preference,
            now,
            &self.config,
        );

        let combined = fairness * session.multiplier * week.multiplier;
        let raw = f64::from(current) * combined;
        let interval_seconds = self.config.clamp_interval(raw);

        let mut summary = format!(
            "Combined multiplier {combined:.2}: {current}s -> {interval_seconds}s"
        );
        if raw < f64::from(self.config.min_interval_secs) {
            summary.push_str(" (clamped to minimum)");
        } else if raw > f64::from(self.config.max_interval_secs) {
            summary.push_str(" (clamped to maximum)");
        }

        Recommendation {
            interval_seconds,
            multipliers: Multipliers {
                fairness,
                session: session.multiplier,
                week: week.multiplier,
                combined,
            },
            reasons: vec![fairness_reason, session.reason, week.reason, summary],
            quota_status: QuotaStatus::from_week_percent(snapshot.week_percent_used),
        }
    }

    /// Recommendation that keeps the caller's interval (within bounds)
    fn unchanged(&self, current: u32, reason: String) -> Recommendation {
        Recommendation {
            interval_seconds: self.config.clamp_interval(f64::from(current)),
            multipliers: Multipliers::neutral(),
            reasons: vec![reason],
            quota_status: QuotaStatus::Unknown,
        }
    }
}
