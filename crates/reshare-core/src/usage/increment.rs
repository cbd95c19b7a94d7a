//! Usage increments posted by agents after each turn.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::DEFAULT_COST_MULTIPLIER;

/// Whether a turn was autonomous or human-directed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageMode {
    Autonomy,
    Collaboration,
}

impl UsageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageMode::Autonomy => "autonomy",
            UsageMode::Collaboration => "collaboration",
        }
    }
}

impl fmt::Display for UsageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "autonomy" => Ok(UsageMode::Autonomy),
            "collaboration" => Ok(UsageMode::Collaboration),
            other => Err(Error::InvalidInput(format!("unknown usage mode: {other}"))),
        }
    }
}

/// A usage report from one agent.
///
/// New clients send `cost_delta` (dollars); older clients send a raw
/// `cache_read_increment` token count instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageIncrement {
    pub claude_name: String,
    pub mode: UsageMode,
    #[serde(default)]
    pub cost_delta: Option<f64>,
    #[serde(default)]
    pub cache_read_increment: Option<u64>,
    #[serde(default)]
    pub context_percentage: Option<f64>,
    /// The agent's current timer interval in seconds
    #[serde(default)]
    pub current_interval: Option<u32>,
}

/// An increment with every stored metric filled in
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedIncrement {
    /// Dollar cost (estimated for legacy token reports)
    pub cost_delta: f64,
    /// Cost divided by the model multiplier, comparable across agents
    pub normalized_usage: f64,
    /// Token count (estimated for dollar reports)
    pub cache_read_increment: u64,
    /// Token-scale weighted cost
    pub weighted_cost: u64,
}

impl UsageIncrement {
    /// True when the report uses the dollar metric
    pub fn reports_cost(&self) -> bool {
        self.cost_delta.is_some()
    }

    /// Fill in both the dollar and token metrics.
    ///
    /// A missing or non-positive multiplier falls back to
    /// [`DEFAULT_COST_MULTIPLIER`].
    pub fn normalize(&self, cost_multiplier: Option<f64>) -> NormalizedIncrement {
        let multiplier = cost_multiplier
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(DEFAULT_COST_MULTIPLIER);

        match self.cost_delta {
            Some(cost) => {
                let cost = if cost.is_finite() { cost.max(0.0) } else { 0.0 };
                let normalized_usage = cost / multiplier;
                NormalizedIncrement {
                    cost_delta: cost,
                    normalized_usage,
                    cache_read_increment: (normalized_usage * 1000.0) as u64,
                    weighted_cost: (normalized_usage * multiplier * 1000.0) as u64,
                }
            }
            None => {
                let tokens = self.cache_read_increment.unwrap_or(0);
                let weighted = tokens as f64 * multiplier;
                NormalizedIncrement {
                    cost_delta: weighted / 1000.0,
                    normalized_usage: tokens as f64,
                    cache_read_increment: tokens,
                    weighted_cost: weighted as u64,
                }
            }
        }
    }

    /// Reject reports the recorder cannot store
    pub fn validate(&self) -> Result<()> {
        if self.claude_name.trim().is_empty() {
            return Err(Error::InvalidInput("claude_name must not be empty".into()));
        }
        if let Some(cost) = self.cost_delta {
            if !cost.is_finite() || cost < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "cost_delta must be a non-negative number, got {cost}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn increment(cost: Option<f64>, tokens: Option<u64>) -> UsageIncrement {
        UsageIncrement {
            claude_name: "Sparkle-Orange".to_string(),
            mode: UsageMode::Autonomy,
            cost_delta: cost,
            cache_read_increment: tokens,
            context_percentage: None,
            current_interval: None,
        }
    }

    #[test]
    fn test_cost_report_divides_by_multiplier() {
        let n = increment(Some(1.5), None).normalize(Some(15.0));
        assert_eq!(
            n,
            NormalizedIncrement {
                cost_delta: 1.5,
                normalized_usage: 0.1,
                cache_read_increment: 100,
                weighted_cost: 1500,
            }
        );
    }

    #[test]
    fn test_legacy_tokens_scale_up() {
        let n = increment(None, Some(2000)).normalize(Some(5.0));
        assert_eq!(n.cache_read_increment, 2000);
        assert_eq!(n.weighted_cost, 10_000);
        assert_eq!(n.cost_delta, 10.0);
        assert_eq!(n.normalized_usage, 2000.0);
    }

    #[test]
    fn test_unknown_agent_uses_default_multiplier() {
        let n = increment(Some(3.0), None).normalize(None);
        assert_eq!(n.normalized_usage, 1.0);
        let n = increment(Some(3.0), None).normalize(Some(0.0));
        assert_eq!(n.normalized_usage, 1.0);
    }

    #[test]
    fn test_empty_report_is_zero() {
        let n = increment(None, None).normalize(Some(3.0));
        assert_eq!(n.cache_read_increment, 0);
        assert_eq!(n.normalized_usage, 0.0);
    }

    #[test]
    fn test_mode_parse_roundtrip() {
        assert_eq!("autonomy".parse::<UsageMode>().unwrap(), UsageMode::Autonomy);
        assert_eq!(
            "collaboration".parse::<UsageMode>().unwrap(),
            UsageMode::Collaboration
        );
        assert!("idle".parse::<UsageMode>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(increment(Some(0.2), None).validate().is_ok());
        assert!(increment(Some(-0.2), None).validate().is_err());
        let mut nameless = increment(None, Some(10));
        nameless.claude_name = " ".to_string();
        assert!(nameless.validate().is_err());
    }
}
