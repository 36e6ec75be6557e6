//! Wire timestamp handling.
//!
//! The document store transports timestamps as integer milliseconds since the
//! Unix epoch; local code works with `DateTime<Utc>`. Decoding is lenient: a
//! missing or malformed wire value falls back to the caller's "now" so a
//! half-written document never breaks a snapshot.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Convert a local time to wire milliseconds.
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Convert wire milliseconds back to a local time, if representable.
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Decode an optional wire timestamp, falling back to `now`.
pub fn decode_time(value: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    value
        .and_then(Value::as_i64)
        .and_then(from_millis)
        .unwrap_or(now)
}
