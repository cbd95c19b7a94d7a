//! Quota windows and the snapshots sampled from them.

pub mod reset;
pub mod types;

pub use reset::{parse_reset_time, ResetTime};
pub use types::{QuotaSnapshot, QuotaStatus, QuotaWindow};
