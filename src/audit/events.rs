use chrono::Utc;
use reshare_core::allocation::RecordedIncrement;
use reshare_core::{QuotaSnapshot, QuotaStatus, Recommendation};
use serde::Serialize;

/// Audit event types for allocation decisions
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum AuditEvent {
    /// An agent reported usage and was given a new interval
    IncrementRecorded {
        ts: u64,
        claude_name: String,
        mode: String,
        cost_delta: f64,
        normalized_usage: f64,
        tokens: u64,
        current_interval: u32,
        recommended_interval: u32,
        combined_multiplier: f64,
        quota_status: QuotaStatus,
    },
    /// A quota reading was stored
    QuotaRecorded {
        ts: u64,
        session_percent_used: u8,
        week_percent_used: u8,
        week_sonnet_percent_used: Option<u8>,
    },
    /// A recommendation was served without recording usage
    IntervalRecommended {
        ts: u64,
        claude_name: String,
        current_interval: Option<u32>,
        recommended_interval: u32,
        combined_multiplier: f64,
        quota_status: QuotaStatus,
        reasons: Vec<String>,
    },
}

/// Milliseconds since the Unix epoch
fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

impl AuditEvent {
    pub fn increment_recorded(recorded: &RecordedIncrement) -> Self {
        AuditEvent::IncrementRecorded {
            ts: u64::try_from(recorded.recorded_at.timestamp_millis()).unwrap_or(0),
            claude_name: recorded.claude_name.clone(),
            mode: recorded.mode.to_string(),
            cost_delta: recorded.metrics.cost_delta,
            normalized_usage: recorded.metrics.normalized_usage,
            tokens: recorded.metrics.cache_read_increment,
            current_interval: recorded.current_interval,
            recommended_interval: recorded.recommendation.interval_seconds,
            combined_multiplier: recorded.recommendation.multipliers.combined,
            quota_status: recorded.recommendation.quota_status,
        }
    }

    pub fn quota_recorded(snapshot: &QuotaSnapshot) -> Self {
        AuditEvent::QuotaRecorded {
            ts: u64::try_from(snapshot.observed_at.timestamp_millis()).unwrap_or(0),
            session_percent_used: snapshot.session_percent_used,
            week_percent_used: snapshot.week_percent_used,
            week_sonnet_percent_used: snapshot.week_sonnet_percent_used,
        }
    }

    pub fn interval_recommended(
        claude_name: &str,
        current_interval: Option<u32>,
        recommendation: &Recommendation,
    ) -> Self {
        AuditEvent::IntervalRecommended {
            ts: now_ms(),
            claude_name: claude_name.to_string(),
            current_interval,
            recommended_interval: recommendation.interval_seconds,
            combined_multiplier: recommendation.multipliers.combined,
            quota_status: recommendation.quota_status,
            reasons: recommendation.reasons.clone(),
        }
    }
}
