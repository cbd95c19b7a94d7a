//! Error type for storage and input validation.
//!
//! The allocation engine itself never fails; these errors come from the
//! collaborators that feed it.

use thiserror::Error;

/// Errors surfaced by the store and by input validation
#[derive(Debug, Error)]
pub enum Error {
    /// SQLite failure
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored JSON column could not be encoded or decoded
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure while preparing the database location
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller-supplied data failed validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A stored row holds a value that cannot be read back
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Result alias for reshare-core operations
pub type Result<T> = std::result::Result<T, Error>;
