//! Quota snapshot and window types.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A recurring, externally reset quota budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaWindow {
    /// The rolling 5-hour session window
    Session,
    /// The 7-day weekly window
    Week,
}

impl QuotaWindow {
    /// Label used in human-readable reasons
    pub fn label(&self) -> &'static str {
        match self {
            QuotaWindow::Session => "Session",
            QuotaWindow::Week => "Week",
        }
    }

    /// Nominal length of the window before any configuration override
    pub fn nominal_duration(&self) -> Duration {
        match self {
            QuotaWindow::Session => Duration::hours(5),
            QuotaWindow::Week => Duration::days(7),
        }
    }
}

impl fmt::Display for QuotaWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One reading of the account-wide quota meters.
///
/// Reset times are kept as the text that was sampled; the engine decides
/// whether they parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// Percent of the session window used (0-100)
    pub session_percent_used: u8,
    /// Percent of the weekly window used across all models (0-100)
    pub week_percent_used: u8,
    /// Percent of the Sonnet-only weekly meter, when reported
    #[serde(default)]
    pub week_sonnet_percent_used: Option<u8>,
    /// When the session window resets
    #[serde(default)]
    pub session_reset: Option<String>,
    /// When the weekly windows reset
    #[serde(default)]
    pub week_reset: Option<String>,
    /// When this reading was taken
    pub observed_at: DateTime<Utc>,
}

impl QuotaSnapshot {
    /// Percent used for the given window
    pub fn percent_used(&self, window: QuotaWindow) -> u8 {
        match window {
            QuotaWindow::Session => self.session_percent_used,
            QuotaWindow::Week => self.week_percent_used,
        }
    }

    /// Raw reset text for the given window
    pub fn reset(&self, window: QuotaWindow) -> Option<&str> {
        match window {
            QuotaWindow::Session => self.session_reset.as_deref(),
            QuotaWindow::Week => self.week_reset.as_deref(),
        }
    }

    /// Clamp every percentage into 0..=100
    pub fn normalized(mut self) -> Self {
        self.session_percent_used = self.session_percent_used.min(100);
        self.week_percent_used = self.week_percent_used.min(100);
        self.week_sonnet_percent_used = self.week_sonnet_percent_used.map(|p| p.min(100));
        self
    }
}

/// Coarse quota pressure derived from the weekly meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    Good,
    Medium,
    High,
    Critical,
    /// No quota snapshot was available
    Unknown,
}

impl QuotaStatus {
    /// Classify raw weekly percent used
    pub fn from_week_percent(percent: u8) -> Self {
        match percent {
            p if p > 80 => QuotaStatus::Critical,
            p if p > 60 => QuotaStatus::High,
            p if p > 40 => QuotaStatus::Medium,
            _ => QuotaStatus::Good,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaStatus::Good => "good",
            QuotaStatus::Medium => "medium",
            QuotaStatus::High => "high",
            QuotaStatus::Critical => "critical",
            QuotaStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
