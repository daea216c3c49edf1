//! # Clock / TimeZone Normalizer
//!
//! Converts a business's local wall-clock times plus an IANA timezone into
//! absolute UTC instants. Pure functions, no state, no access to "now".
//!
//! ## Why Normalize Eagerly?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Request: date=2024-06-01 start=10:00 end=12:00 tz=America/Chicago      │
//! │       │                                                                 │
//! │       ▼  normalize_window()                                             │
//! │  UTC:  [2024-06-01T15:00:00Z, 2024-06-01T17:00:00Z)                     │
//! │                                                                         │
//! │  Everything downstream (buffers, conflict detection, storage) works    │
//! │  exclusively in UTC. Local time exists only at this boundary.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## DST Edge Cases
//! - Spring-forward gap (the local time does not exist): `InvalidWindow`
//! - Fall-back ambiguity (the local time occurs twice): the earlier
//!   instant is chosen, matching how the reference system books the
//!   first occurrence

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CoreError, CoreResult};

/// Parses an IANA timezone name (e.g. "America/Chicago").
pub fn parse_timezone(name: &str) -> CoreResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CoreError::UnknownTimezone(name.to_string()))
}

/// Converts a local date + wall-clock time in `tz` to a UTC instant.
///
/// ## Errors
/// - `InvalidWindow` if the local time falls in a DST gap and therefore
///   never occurs in that zone.
pub fn to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> CoreResult<DateTime<Utc>> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // Fall-back hour: both instants are real; book the earlier one.
        LocalResult::Ambiguous(earliest, _latest) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(CoreError::invalid_window(format!(
            "local time {naive} does not exist in {tz} (DST gap)"
        ))),
    }
}

/// Normalizes a requested local window into UTC.
///
/// ## Contract
/// - Both endpoints are interpreted as wall-clock times on `date` in `tz`
/// - The start must precede the end **after** conversion; a window that
///   parses but collapses or inverts under DST is rejected
///
/// ## Returns
/// The half-open UTC window `(start, end)`.
pub fn normalize_window(
    date: NaiveDate,
    start_local: NaiveTime,
    end_local: NaiveTime,
    tz: Tz,
) -> CoreResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = to_utc(date, start_local, tz)?;
    let end = to_utc(date, end_local, tz)?;

    if start >= end {
        return Err(CoreError::invalid_window(format!(
            "start {start} must precede end {end}"
        )));
    }

    Ok((start, end))
}

// =============================================================================
// Unit Tests
// =============================================================================
