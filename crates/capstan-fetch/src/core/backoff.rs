use std::time::Duration;

/// Delay before retry number `attempt` (0-indexed) using exponential
/// backoff.
///
/// The delay doubles with every retry: `base * 2^attempt`. Saturates
/// instead of overflowing for large attempt counts.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use capstan_fetch::backoff_delay;
///
/// let base = Duration::from_millis(500);
/// assert_eq!(backoff_delay(0, base), Duration::from_millis(500));
/// assert_eq!(backoff_delay(1, base), Duration::from_millis(1000));
/// assert_eq!(backoff_delay(2, base), Duration::from_millis(2000));
/// ```
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt() {
        let base = Duration::from_millis(100);
        let delays: Vec<_> = (0..5).map(|n| backoff_delay(n, base)).collect();
        for pair in delays.windows(2) {
            assert_eq!(pair[1], pair[0] * 2);
        }
    }

    #[test]
    fn zero_base_stays_zero() {
        assert_eq!(backoff_delay(10, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let delay = backoff_delay(u32::MAX, Duration::from_secs(u64::MAX / 2));
        assert!(delay > Duration::ZERO);
    }
}
