//! Backoff schedule for retryable job failures.

use std::time::Duration;

const MAX_DELAY: Duration = Duration::from_secs(3600);

/// Delay before the next attempt after `attempts_made` failed attempts.
///
/// | Attempts made | Delay with `base = 5s` |
/// |---------------|------------------------|
/// | 1             | 5 s                    |
/// | 2             | 10 s                   |
/// | 3             | 20 s                   |
///
/// The exponent is capped and the result saturates at one hour.
#[must_use]
pub fn backoff_delay(base: Duration, attempts_made: u32) -> Duration {
    let exponent = attempts_made.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(MAX_DELAY)
}
