//! Key encoding for the shared record/pointer keyspace.
//!
//! Record keys are the raw post id bytes. Expiration pointer keys are
//! `exp-` followed by the expiry as a 19-digit zero-padded count of Unix
//! nanoseconds, so byte order equals chronological order.

use chrono::{DateTime, Utc};

use crate::record::POINTER_PREFIX;

/// Width of the zero-padded timestamp; `i64::MAX` has 19 digits.
const TIMESTAMP_WIDTH: usize = 19;

/// Exclusive upper bound of the pointer range (`'.'` follows `'-'`).
pub const POINTER_RANGE_END: &[u8] = b"exp.";

/// Inclusive lower bound of the pointer range.
pub fn pointer_range_start() -> &'static [u8] {
    POINTER_PREFIX.as_bytes()
}

/// Key under which a record is stored.
pub fn record_key(id: &str) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Unix nanoseconds for a timestamp, clamped at zero.
///
/// Timestamps outside the range representable in `i64` nanoseconds
/// (years before 1677 or after 2262) saturate.
pub fn to_nanos(at: DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt()
        .unwrap_or(if at.timestamp() < 0 { 0 } else { i64::MAX })
        .max(0)
}

/// Pointer key for an expiry instant given in Unix nanoseconds.
pub fn pointer_key(expires_at: i64) -> Vec<u8> {
    format!("{POINTER_PREFIX}{:0width$}", expires_at.max(0), width = TIMESTAMP_WIDTH).into_bytes()
}

/// Decode the expiry timestamp from a pointer key.
///
/// Returns `None` for keys outside the pointer namespace or with a
/// malformed timestamp.
pub fn parse_pointer_key(key: &[u8]) -> Option<i64> {
    let digits = key.strip_prefix(POINTER_PREFIX.as_bytes())?;
    if digits.len() != TIMESTAMP_WIDTH || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}
