//! Immutable tuning for the allocation engine.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::quota::QuotaWindow;

/// Longest window length accepted (seconds), one leap year
pub const MAX_WINDOW_SECS: i64 = 366 * 24 * 3600;

/// Bounds, defaults and window lengths used by [`AllocationEngine`](super::AllocationEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Shortest interval ever recommended (seconds)
    pub min_interval_secs: u32,
    /// Longest interval ever recommended (seconds)
    pub max_interval_secs: u32,
    /// Interval assumed when the caller does not report one (seconds)
    pub default_interval_secs: u32,
    /// Session window length (seconds)
    pub session_window_secs: i64,
    /// Weekly window length (seconds)
    pub week_window_secs: i64,
    /// Lower clamp for the fairness multiplier
    pub fairness_floor: f64,
    /// Upper clamp for the fairness multiplier
    pub fairness_ceiling: f64,
    /// Multiplier for an idle agent among active peers
    pub idle_encouragement: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 900,
            max_interval_secs: 7200,
            default_interval_secs: 1800,
            session_window_secs: QuotaWindow::Session.nominal_duration().num_seconds(),
            week_window_secs: QuotaWindow::Week.nominal_duration().num_seconds(),
            fairness_floor: 0.5,
            fairness_ceiling: 2.0,
            idle_encouragement: 0.5,
        }
    }
}

impl AllocationConfig {
    /// Length of the given window, `None` when it is outside chrono's range
    pub fn window_duration(&self, window: QuotaWindow) -> Option<Duration> {
        match window {
            QuotaWindow::Session => Duration::try_seconds(self.session_window_secs),
            QuotaWindow::Week => Duration::try_seconds(self.week_window_secs),
        }
    }

    /// Clamp an interval into the configured bounds
    pub fn clamp_interval(&self, secs: f64) -> u32 {
        let min = f64::from(self.min_interval_secs);
        let max = f64::from(self.max_interval_secs);
        if secs.is_nan() {
            return self.min_interval_secs;
        }
        secs.clamp(min, max).round() as u32
    }

    /// Check that the bounds are usable
    pub fn validate(&self) -> Result<()> {
        if self.min_interval_secs == 0 {
            return Err(Error::InvalidInput("min_interval_secs must be > 0".into()));
        }
        if self.min_interval_secs > self.max_interval_secs {
            return Err(Error::InvalidInput(format!(
                "min_interval_secs ({}) exceeds max_interval_secs ({})",
                self.min_interval_secs, self.max_interval_secs
            )));
        }
        if self.session_window_secs <= 0 || self.week_window_secs <= 0 {
            return Err(Error::InvalidInput("window lengths must be positive".into()));
        }
        if self.session_window_secs > MAX_WINDOW_SECS || self.week_window_secs > MAX_WINDOW_SECS {
            return Err(Error::InvalidInput(format!(
                "window lengths must not exceed {MAX_WINDOW_SECS} seconds"
            )));
        }
        let multipliers = [
            self.fairness_floor,
            self.fairness_ceiling,
            self.idle_encouragement,
        ];
        if multipliers.iter().any(|m| !m.is_finite() || *m <= 0.0) {
            return Err(Error::InvalidInput(
                "fairness multipliers must be positive".into(),
            ));
        }
        if self.fairness_floor > self.fairness_ceiling {
            return Err(Error::InvalidInput(
                "fairness_floor exceeds fairness_ceiling".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AllocationConfig::default();
        assert_eq!(config.min_interval_secs, 900);
        assert_eq!(config.max_interval_secs, 7200);
        assert_eq!(config.default_interval_secs, 1800);
        assert_eq!(config.session_window_secs, 5 * 3600);
        assert_eq!(config.week_window_secs, 7 * 24 * 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_clamp_interval() {
        let config = AllocationConfig::default();
        assert_eq!(config.clamp_interval(0.0), 900);
        assert_eq!(config.clamp_interval(1800.4), 1800);
        assert_eq!(config.clamp_interval(1800.5), 1801);
        assert_eq!(config.clamp_interval(1e12), 7200);
        assert_eq!(config.clamp_interval(f64::INFINITY), 7200);
        assert_eq!(config.clamp_interval(f64::NEG_INFINITY), 900);
        assert_eq!(config.clamp_interval(f64::NAN), 900);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = AllocationConfig {
            min_interval_secs: 8000,
            ..AllocationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AllocationConfig {
            week_window_secs: 0,
            ..AllocationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AllocationConfig {
            fairness_floor: 3.0,
            ..AllocationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_windows() {
        let config = AllocationConfig {
            week_window_secs: i64::from(u32::MAX) * 86_400,
            ..AllocationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AllocationConfig {
            session_window_secs: MAX_WINDOW_SECS + 1,
            ..AllocationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AllocationConfig {
            week_window_secs: MAX_WINDOW_SECS,
            ..AllocationConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_duration_out_of_range() {
        let config = AllocationConfig {
            session_window_secs: i64::MAX,
            ..AllocationConfig::default()
        };
        assert_eq!(config.window_duration(QuotaWindow::Session), None);
        assert_eq!(
            config.window_duration(QuotaWindow::Week),
            Some(Duration::hours(168))
        );
    }
}
