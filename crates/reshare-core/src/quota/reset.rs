//! Parsing of stored reset instants.
//!
//! Snapshots written by this crate use RFC 3339. Older rows carry naive
//! ISO-8601 timestamps without an offset; those are read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Outcome of interpreting a window's reset field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTime {
    /// No reset time was recorded
    Missing,
    /// Something was recorded but it is not a timestamp
    Invalid,
    /// A usable reset instant
    At(DateTime<Utc>),
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Interpret an optional reset field
pub fn parse_reset_time(raw: Option<&str>) -> ResetTime {
    let text = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return ResetTime::Missing,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return ResetTime::At(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| ResetTime::At(naive.and_utc()))
        .unwrap_or(ResetTime::Invalid)
}
