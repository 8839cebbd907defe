//! Shared primitive types used across the ledger.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// A stable, unique account identifier (chosen at signup).
pub type AccountId = String;

/// A group identifier (UUID v4, assigned at creation).
pub type GroupId = String;

/// Whole Naira units. Never fractional.
pub type Amount = i64;

/// One round of collection, starting at 1.
pub type CycleNumber = u32;

/// Monotonically increasing transaction record id.
pub type TxnId = i64;

pub type Timestamp = DateTime<Utc>;

/// Raised when a stored enum string has no matching variant.
#[derive(Debug, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind:  &'static str,
    pub value: String,
}

/// Canonical text form for timestamps in the store.
/// Fixed-width micros keep lexical order equal to time order.
pub fn timestamp_to_sql(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn timestamp_from_sql(raw: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}
