//! Wires the engine to its input providers and a clock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::Result;
use crate::providers::{
    IdentityRegistry, QuotaSnapshotProvider, UsageHistoryProvider, UsageRecorder,
};
use crate::usage::{NormalizedIncrement, UsageHistory, UsageIncrement, UsageMode};

use super::config::AllocationConfig;
use super::engine::{AllocationEngine, Recommendation};

/// Default trailing window for fairness comparisons
pub const DEFAULT_USAGE_WINDOW_HOURS: u32 = 24;

/// What was stored for one usage increment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedIncrement {
    pub claude_name: String,
    pub mode: UsageMode,
    /// True when the client reported dollars rather than tokens
    pub reported_cost: bool,
    pub metrics: NormalizedIncrement,
    pub current_interval: u32,
    pub recommendation: Recommendation,
    pub recorded_at: DateTime<Utc>,
}

/// Fetches the engine's inputs and asks it for a recommendation.
///
/// Provider failures are returned to the caller; the engine itself never
/// fails.
pub struct AllocationService<P, C> {
    engine: AllocationEngine,
    inputs: P,
    clock: C,
    usage_window_hours: u32,
}

impl<P, C> AllocationService<P, C>
where
    P: QuotaSnapshotProvider + IdentityRegistry + UsageHistoryProvider,
    C: Clock,
{
    pub fn new(config: AllocationConfig, inputs: P, clock: C) -> Self {
        Self {
            engine: AllocationEngine::new(config),
            inputs,
            clock,
            usage_window_hours: DEFAULT_USAGE_WINDOW_HOURS,
        }
    }

    /// Override the fairness look-back window
    pub fn with_usage_window_hours(mut self, hours: u32) -> Self {
        self.usage_window_hours = hours.max(1);
        self
    }

    pub fn engine(&self) -> &AllocationEngine {
        &self.engine
    }

    pub fn inputs(&self) -> &P {
        &self.inputs
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Recommend the next interval for `agent`
    pub fn recommend_interval(
        &self,
        agent: &str,
        current_interval: Option<u32>,
    ) -> Result<Recommendation> {
        self.recommend_at(agent, current_interval, self.clock.now())
    }

    fn recommend_at(
        &self,
        agent: &str,
        current_interval: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Recommendation> {
        let snapshot = self.inputs.latest_quota_snapshot()?;
        let identity = match snapshot {
            Some(_) => self.inputs.agent_identity(agent)?,
            None => None,
        };
        let history = match identity {
            Some(_) => self
                .inputs
                .recent_weighted_usage(self.usage_window_hours, now)?,
            None => UsageHistory::new(),
        };

        let recommendation = self.engine.recommend(
            agent,
            current_interval,
            snapshot.as_ref(),
            identity.as_ref(),
            &history,
            now,
        );

        debug!(
            agent,
            interval = recommendation.interval_seconds,
            combined = recommendation.multipliers.combined,
            status = %recommendation.quota_status,
            "Computed interval recommendation"
        );

        Ok(recommendation)
    }
}

impl<P, C> AllocationService<P, C>
where
    P: QuotaSnapshotProvider + IdentityRegistry + UsageHistoryProvider + UsageRecorder,
    C: Clock,
{
    /// Recommend the next interval for the reporting agent, then store the
    /// increment alongside that recommendation.
    pub fn record_usage(&self, increment: &UsageIncrement) -> Result<RecordedIncrement> {
        increment.validate()?;

        let current_interval = increment
            .current_interval
            .unwrap_or(self.engine.config().default_interval_secs);
        let now = self.clock.now();
        let recommendation =
            self.recommend_at(&increment.claude_name, Some(current_interval), now)?;
        let metrics =
            self.inputs
                .record_increment(increment, current_interval, &recommendation, now)?;

        if increment.reports_cost() {
            info!(
                "Recorded ${:.4} cost (normalized: {:.2}) for {} ({}), recommended interval: {}s",
                metrics.cost_delta,
                metrics.normalized_usage,
                increment.claude_name,
                increment.mode,
                recommendation.interval_seconds
            );
        } else {
            info!(
                "Recorded {} tokens for {} ({}), recommended interval: {}s",
                metrics.cache_read_increment,
                increment.claude_name,
                increment.mode,
                recommendation.interval_seconds
            );
        }

        Ok(RecordedIncrement {
            claude_name: increment.claude_name.clone(),
            mode: increment.mode,
            reported_cost: increment.reports_cost(),
            metrics,
            current_interval,
            recommendation,
            recorded_at: now,
        })
    }
}
