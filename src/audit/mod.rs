//! Decision audit log: one JSON line per recorded increment, quota reading
//! and served recommendation.

pub mod events;
pub mod logger;

pub use events::AuditEvent;
pub use logger::AuditLogger;
