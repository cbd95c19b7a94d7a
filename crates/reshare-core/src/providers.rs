//! Inputs the allocation service reads from its collaborators.
//!
//! [`Store`](crate::store::Store) implements all of them; tests use
//! in-memory fakes.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::allocation::Recommendation;
use crate::error::Result;
use crate::identity::AgentIdentity;
use crate::quota::QuotaSnapshot;
use crate::usage::{NormalizedIncrement, UsageHistory, UsageIncrement};

/// Supplies the most recent quota reading
pub trait QuotaSnapshotProvider {
    fn latest_quota_snapshot(&self) -> Result<Option<QuotaSnapshot>>;
}

/// Supplies agent identities
pub trait IdentityRegistry {
    fn agent_identity(&self, name: &str) -> Result<Option<AgentIdentity>>;
}

/// Supplies trailing-window weighted usage.
///
/// Implementations must list every registered agent, defaulting to zero.
pub trait UsageHistoryProvider {
    fn recent_weighted_usage(&self, window_hours: u32, now: DateTime<Utc>)
        -> Result<UsageHistory>;
}

/// Durably records a usage increment together with the recommendation it
/// produced.
///
/// Implementations must apply the increment row and the daily totals as one
/// atomic write so concurrent readers never observe half of it.
pub trait UsageRecorder {
    fn record_increment(
        &self,
        increment: &UsageIncrement,
        current_interval: u32,
        recommendation: &Recommendation,
        now: DateTime<Utc>,
    ) -> Result<NormalizedIncrement>;
}

impl<T: QuotaSnapshotProvider + ?Sized> QuotaSnapshotProvider for Arc<T> {
    fn latest_quota_snapshot(&self) -> Result<Option<QuotaSnapshot>> {
        (**self).latest_quota_snapshot()
    }
}

impl<T: IdentityRegistry + ?Sized> IdentityRegistry for Arc<T> {
    fn agent_identity(&self, name: &str) -> Result<Option<AgentIdentity>> {
        (**self).agent_identity(name)
    }
}

impl<T: UsageHistoryProvider + ?Sized> UsageHistoryProvider for Arc<T> {
    fn recent_weighted_usage(
        &self,
        window_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<UsageHistory> {
        (**self).recent_weighted_usage(window_hours, now)
    }
}

impl<T: UsageRecorder + ?Sized> UsageRecorder for Arc<T> {
    fn record_increment(
        &self,
        increment: &UsageIncrement,
        current_interval: u32,
        recommendation: &Recommendation,
        now: DateTime<Utc>,
    ) -> Result<NormalizedIncrement> {
        (**self).record_increment(increment, current_interval, recommendation, now)
    }
}
