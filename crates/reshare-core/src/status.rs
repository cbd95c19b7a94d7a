//! Read-only status view: per-agent collaboration balance and quota meters.
//!
//! Everything here is a pure function of stored data and `now`, so the web
//! layer and tests can build the same view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::quota::{parse_reset_time, QuotaSnapshot, QuotaStatus, ResetTime};
use crate::store::AgentActivity;

/// Extra collaboration share, in points above the preference, still shown
/// as moderate
const MODERATE_MARGIN: u8 = 10;

/// How open an agent currently is to human-directed work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Moderate,
    Busy,
}

impl Availability {
    /// Compare today's collaboration share against the agent's preference
    pub fn from_collaboration(collaboration_percent: u8, preference_percent: u8) -> Self {
        let pct = u16::from(collaboration_percent);
        let pref = u16::from(preference_percent);
        if pct < pref {
            Availability::Available
        } else if pct < pref + u16::from(MODERATE_MARGIN) {
            Availability::Moderate
        } else {
            Availability::Busy
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Availability::Available => "Welcomes collaboration",
            Availability::Moderate => "At preference",
            Availability::Busy => "Over preference",
        }
    }
}

/// One agent's row in the status view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatusView {
    pub name: String,
    pub model: Option<String>,
    pub autonomous_usage: f64,
    pub collaborative_usage: f64,
    pub total_usage: f64,
    /// Collaboration share of today's usage, truncated to a whole percent
    pub collaboration_percent: u8,
    pub collaborative_preference_percent: u8,
    pub availability: Availability,
    pub availability_text: &'static str,
    /// "in 12min", "overdue by 3h" or "No recent activity"
    pub next_prompt_due: String,
}

/// Quota meters as shown to humans
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaView {
    pub session_percent_used: u8,
    pub week_percent_used: u8,
    pub week_sonnet_percent_used: Option<u8>,
    pub session_reset: String,
    pub week_reset: String,
    pub status: QuotaStatus,
    pub observed_at: DateTime<Utc>,
}

/// The whole status view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardData {
    pub quota: Option<QuotaView>,
    pub agents: Vec<AgentStatusView>,
    pub generated_at: DateTime<Utc>,
}

/// Integer collaboration share; zero when nothing was used
pub fn collaboration_percent(autonomous: f64, collaborative: f64) -> u8 {
    let total = autonomous + collaborative;
    if !total.is_finite() || total <= 0.0 {
        return 0;
    }
    ((collaborative / total) * 100.0).clamp(0.0, 100.0) as u8
}

/// Human-readable distance from `now` to `target`.
///
/// Under an hour is shown in whole minutes, otherwise whole hours; both
/// truncate.
pub fn format_time_until(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (target - now).num_seconds();
    let magnitude = secs.unsigned_abs();
    let amount = if magnitude < 3600 {
        format!("{}min", magnitude / 60)
    } else {
        format!("{}h", magnitude / 3600)
    };
    if secs < 0 {
        format!("overdue by {amount}")
    } else {
        format!("in {amount}")
    }
}

/// Short reset label: `10:59pm` on the same day, `jan 8, 7:59am` otherwise.
///
/// Missing or unparsable reset text renders as "Unknown".
pub fn format_reset_time(raw: Option<&str>, now: DateTime<Utc>) -> String {
    match parse_reset_time(raw) {
        ResetTime::At(reset) if reset.date_naive() == now.date_naive() => {
            reset.format("%-I:%M%p").to_string().to_lowercase()
        }
        ResetTime::At(reset) => reset.format("%b %-d, %-I:%M%p").to_string().to_lowercase(),
        ResetTime::Missing | ResetTime::Invalid => "Unknown".to_string(),
    }
}

impl AgentStatusView {
    pub fn from_activity(activity: &AgentActivity, now: DateTime<Utc>) -> Self {
        let collaboration_percent =
            collaboration_percent(activity.autonomous_usage, activity.collaborative_usage);
        let availability = Availability::from_collaboration(
            collaboration_percent,
            activity.collaborative_preference_percent,
        );
        let next_prompt_due = activity
            .last_autonomy
            .filter(|last| last.recommended_interval > 0)
            .map(|last| format_time_until(last.next_due(), now))
            .unwrap_or_else(|| "No recent activity".to_string());

        Self {
            name: activity.name.clone(),
            model: activity.model.clone(),
            autonomous_usage: activity.autonomous_usage,
            collaborative_usage: activity.collaborative_usage,
            total_usage: activity.autonomous_usage + activity.collaborative_usage,
            collaboration_percent,
            collaborative_preference_percent: activity.collaborative_preference_percent,
            availability,
            availability_text: availability.description(),
            next_prompt_due,
        }
    }
}

impl QuotaView {
    pub fn from_snapshot(snapshot: &QuotaSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            session_percent_used: snapshot.session_percent_used,
            week_percent_used: snapshot.week_percent_used,
            week_sonnet_percent_used: snapshot.week_sonnet_percent_used,
            session_reset: format_reset_time(snapshot.session_reset.as_deref(), now),
            week_reset: format_reset_time(snapshot.week_reset.as_deref(), now),
            status: QuotaStatus::from_week_percent(snapshot.week_percent_used),
            observed_at: snapshot.observed_at,
        }
    }
}

/// Assemble the status view
pub fn build_dashboard(
    snapshot: Option<&QuotaSnapshot>,
    activity: &[AgentActivity],
    now: DateTime<Utc>,
) -> DashboardData {
    DashboardData {
        quota: snapshot.map(|s| QuotaView::from_snapshot(s, now)),
        agents: activity
            .iter()
            .map(|a| AgentStatusView::from_activity(a, now))
            .collect(),
        generated_at: now,
    }
}
