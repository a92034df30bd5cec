//! TTL arithmetic.
//!
//! A backend TTL is an `Option<Duration>`: `None` never expires, `Some(d)`
//! expires `d` after the write. `Some(Duration::ZERO)` is already expired.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Convert a caller-supplied TTL, where zero means "no expiration".
pub fn requested_ttl(ttl: Duration) -> Option<Duration> {
    (!ttl.is_zero()).then_some(ttl)
}

/// TTL implied by an absolute expiration, measured from `now`.
///
/// No expiration yields `None`. An expiration at or before `now` yields
/// `Some(Duration::ZERO)` rather than wrapping into "never expires".
pub fn ttl_until(now: DateTime<Utc>, expires: Option<DateTime<Utc>>) -> Option<Duration> {
    let expires = expires?;
    Some((expires - now).to_std().unwrap_or(Duration::ZERO))
}

/// The shorter of two TTLs, treating `None` as unbounded.
pub fn min_ttl(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(d), None) | (None, Some(d)) => Some(d),
        (None, None) => None,
    }
}

/// Absolute expiration for a value written at `now` with `ttl`.
///
/// TTLs that overflow the calendar are treated as never expiring.
pub fn expires_at(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    let delta = chrono::Duration::from_std(ttl?).ok()?;
    now.checked_add_signed(delta)
}
