//! Trailing-window weighted usage for every known agent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Weighted usage per agent over a trailing window.
///
/// Values are kept non-negative and finite; anything else is stored as zero
/// so fairness comparisons never see NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageHistory {
    usage: BTreeMap<String, f64>,
}

impl UsageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history that lists every agent in `known`, defaulting to zero
    pub fn with_agents<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut history = Self::new();
        for name in known {
            history.usage.insert(name.into(), 0.0);
        }
        history
    }

    /// Set an agent's usage, sanitising the value
    pub fn set(&mut self, agent: impl Into<String>, usage: f64) {
        self.usage.insert(agent.into(), sanitize(usage));
    }

    /// Add to an agent's usage, registering it if absent
    pub fn add(&mut self, agent: &str, usage: f64) {
        let entry = self.usage.entry(agent.to_string()).or_insert(0.0);
        *entry = sanitize(*entry + sanitize(usage));
    }

    /// Usage for an agent; absent agents read as zero
    pub fn get(&self, agent: &str) -> f64 {
        self.usage.get(agent).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.usage.contains_key(agent)
    }

    /// Make sure an agent has an entry, without touching existing usage
    pub fn ensure(&mut self, agent: &str) {
        self.usage.entry(agent.to_string()).or_insert(0.0);
    }

    /// Smallest strictly positive usage across all agents
    pub fn lowest_positive(&self) -> Option<f64> {
        self.usage
            .values()
            .copied()
            .filter(|u| *u > 0.0)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// True when no agent has positive usage
    pub fn all_zero(&self) -> bool {
        self.usage.values().all(|u| *u <= 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.usage.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usage.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for UsageHistory {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        let mut history = Self::new();
        for (agent, usage) in iter {
            history.set(agent, usage);
        }
        history
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
