//! reshare-core — quota-aware interval allocation for autonomous agents.
//!
//! The [`allocation`] module holds the pure engine that turns a quota
//! snapshot, an agent identity and the recent usage of every agent into a
//! recommended wait interval. Everything else in this crate is plumbing that
//! feeds the engine or records what it decided: the SQLite [`store`], the
//! domain types in [`quota`], [`identity`] and [`usage`], and the read-only
//! [`status`] view.

pub mod allocation;
pub mod clock;
pub mod error;
pub mod identity;
pub mod providers;
pub mod quota;
pub mod status;
pub mod store;
pub mod usage;

pub use allocation::{
    AllocationConfig, AllocationEngine, AllocationService, Multipliers, Recommendation,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use identity::AgentIdentity;
pub use providers::{
    IdentityRegistry, QuotaSnapshotProvider, UsageHistoryProvider, UsageRecorder,
};
pub use quota::{QuotaSnapshot, QuotaStatus, QuotaWindow};
pub use status::DashboardData;
pub use store::Store;
pub use usage::{UsageHistory, UsageIncrement, UsageMode};
