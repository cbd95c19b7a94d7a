//! Per-window pacing.
//!
//! One routine serves both the session and the weekly window: it compares
//! the share of the autonomous budget already spent with the share of the
//! window that has elapsed.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::quota::{parse_reset_time, QuotaWindow, ResetTime};

use super::config::AllocationConfig;

/// Result of pacing one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaceAssessment {
    pub window: QuotaWindow,
    pub multiplier: f64,
    pub reason: String,
    /// Elapsed share of the window, when it could be computed
    pub time_fraction: Option<f64>,
    /// Spend rate relative to elapsed time, when it could be computed
    pub pace_ratio: Option<f64>,
}

impl PaceAssessment {
    fn neutral(window: QuotaWindow, detail: &str) -> Self {
        Self {
            window,
            multiplier: 1.0,
            reason: format!("{}: {}", window.label(), detail),
            time_fraction: None,
            pace_ratio: None,
        }
    }
}

/// Pace multiplier for one quota window.
///
/// Stale or missing reset data degrades to a neutral `1.0`; so does a
/// window that has not started yet. Bucket edges: `> 1.5`, `> 1.1`,
/// `>= 0.9`, `>= 0.7`.
pub fn window_pace(
    window: QuotaWindow,
    percent_used: u8,
    reset: Option<&str>,
    collaborative_preference_percent: u8,
    now: DateTime<Utc>,
    config: &AllocationConfig,
) -> PaceAssessment {
    let reset_at = match parse_reset_time(reset) {
        ResetTime::Missing => return PaceAssessment::neutral(window, "no reset time available"),
        ResetTime::Invalid => return PaceAssessment::neutral(window, "invalid reset time"),
        ResetTime::At(at) => at,
    };

    if reset_at < now {
        return PaceAssessment::neutral(window, "reset time has passed");
    }

    let Some(duration) = config.window_duration(window) else {
        return PaceAssessment::neutral(window, "invalid window length");
    };
    let duration_ms = duration.num_milliseconds();
    if duration_ms <= 0 {
        return PaceAssessment::neutral(window, "window length is not configured");
    }

    let Some(window_start) = reset_at.checked_sub_signed(duration) else {
        return PaceAssessment::neutral(window, "invalid window length");
    };
    let elapsed_ms = (now - window_start).num_milliseconds();
    let time_fraction = (elapsed_ms as f64 / duration_ms as f64).clamp(0.0, 1.0);
    if time_fraction == 0.0 {
        let mut assessment = PaceAssessment::neutral(window, "just started");
        assessment.time_fraction = Some(0.0);
        return assessment;
    }

    let percent_used = percent_used.min(100);
    let autonomous_quota = 100.0 - f64::from(collaborative_preference_percent.min(100));
    let autonomous_used_fraction = if autonomous_quota <= 0.0 {
        0.0
    } else {
        f64::from(percent_used) / autonomous_quota
    };

    let pace_ratio = autonomous_used_fraction / time_fraction;
    let (multiplier, verdict) = bucket(pace_ratio);
    let elapsed_pct = (time_fraction * 100.0).round() as u32;

    PaceAssessment {
        window,
        multiplier,
        reason: format!(
            "{} {}% used, {}% elapsed - {}",
            window.label(),
            percent_used,
            elapsed_pct,
            verdict
        ),
        time_fraction: Some(time_fraction),
        pace_ratio: Some(pace_ratio),
    }
}

/// Map a pace ratio onto its multiplier bucket
fn bucket(pace_ratio: f64) -> (f64, &'static str) {
    if pace_ratio > 1.5 {
        (1.5, "slowing down")
    } else if pace_ratio > 1.1 {
        (1.2, "slight slowdown")
    } else if pace_ratio >= 0.9 {
        (1.0, "on track")
    } else if pace_ratio >= 0.7 {
        (0.9, "slight speedup")
    } else {
        (0.7, "can speed up")
    }
}
