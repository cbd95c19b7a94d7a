//! Usage increments reported by agents and the trailing-window history
//! used for fairness.

pub mod history;
pub mod increment;

pub use history::UsageHistory;
pub use increment::{NormalizedIncrement, UsageIncrement, UsageMode};
