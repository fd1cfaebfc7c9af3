//! Dismissal window arithmetic.
//!
//! Pure helpers over epoch-millisecond timestamps so the 24-hour window is
//! testable without a clock.

/// How long a dismissal suppresses re-prompting, in hours.
pub const DISMISS_DURATION_HOURS: i64 = 24;

/// Milliseconds in one hour.
pub const MS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Dismissal window length in milliseconds.
pub const DISMISS_DURATION_MS: i64 = DISMISS_DURATION_HOURS * MS_PER_HOUR;

/// Whether a dismissal stamped at `dismissed_at` is still active at `now`.
///
/// Active means strictly inside the window: exactly 24 hours after the
/// stamp the dismissal has expired.
pub fn is_active(dismissed_at: i64, now: i64) -> bool {
    now.saturating_sub(dismissed_at) < DISMISS_DURATION_MS
}

/// When the dismissal stamped at `dismissed_at` expires, if it still is
/// inside its window at `now`.
pub fn dismissed_until(dismissed_at: i64, now: i64) -> Option<i64> {
    let expires_at = dismissed_at.saturating_add(DISMISS_DURATION_MS);
    (expires_at > now).then_some(expires_at)
}
