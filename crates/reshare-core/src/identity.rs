//! Registered agent identities.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Cost multiplier assumed for agents missing from the registry (Sonnet-class)
pub const DEFAULT_COST_MULTIPLIER: f64 = 3.0;

/// An agent known to the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Unique agent name (e.g. "Sparkle-Orange")
    pub name: String,
    /// Underlying model, informational
    #[serde(default)]
    pub model: Option<String>,
    /// Relative dollar cost of the agent's model
    pub cost_multiplier: f64,
    /// Share of activity reserved for human-directed work (0-100)
    pub collaborative_preference_percent: u8,
    /// Inactive agents are kept for history but left out of comparisons
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl AgentIdentity {
    /// Create an active identity, rejecting values the engine cannot use
    pub fn new(
        name: impl Into<String>,
        cost_multiplier: f64,
        collaborative_preference_percent: u8,
    ) -> Result<Self> {
        let identity = Self {
            name: name.into(),
            model: None,
            cost_multiplier,
            collaborative_preference_percent,
            active: true,
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Attach the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Check registry invariants
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("agent name must not be empty".into()));
        }
        if !self.cost_multiplier.is_finite() || self.cost_multiplier <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "cost_multiplier must be positive, got {}",
                self.cost_multiplier
            )));
        }
        if self.collaborative_preference_percent > 100 {
            return Err(Error::InvalidInput(format!(
                "collaborative preference must be 0-100, got {}",
                self.collaborative_preference_percent
            )));
        }
        Ok(())
    }
}
