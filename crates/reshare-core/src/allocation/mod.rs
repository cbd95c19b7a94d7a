//! Adaptive interval allocation.
//!
//! Three independent multipliers are combined and applied to an agent's
//! current timer interval:
//!
//! - [`fairness`]: slows agents that used more than the least active peer
//! - [`pace`]: keeps consumption of each quota window in step with elapsed time
//! - [`engine`]: combination, clamping and the reasons trail

pub mod config;
pub mod engine;
pub mod fairness;
pub mod pace;
pub mod service;

pub use config::{AllocationConfig, MAX_WINDOW_SECS};
pub use engine::{AllocationEngine, Multipliers, Recommendation};
pub use fairness::fairness_multiplier;
pub use pace::{window_pace, PaceAssessment};
pub use service::{AllocationService, RecordedIncrement, DEFAULT_USAGE_WINDOW_HOURS};
