//! Back-off strategies.

use std::time::Duration;

/// Computes the wait before retrying.
pub trait Backoff: Send + Sync + 'static {
    /// Returns the delay after failed attempt number `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Exponential back-off with full jitter.
///
/// The delay after attempt `n` is uniformly drawn from
/// `[0, min(base * 2^(n-1), max)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    /// Default base delay.
    pub const DEFAULT_BASE: Duration = Duration::from_secs(1);
    /// Default delay cap.
    pub const DEFAULT_MAX: Duration = Duration::from_secs(20);

    /// Creates a back-off with the given base and cap.
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Returns the upper bound of the jittered delay after `attempt`.
    #[must_use]
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1_u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE, Self::DEFAULT_MAX)
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        self.ceiling(attempt).mul_f64(fastrand::f64())
    }
}

/// The same delay after every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedBackoff(pub Duration);

impl Backoff for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_doubles_until_cap() {
        let backoff = ExponentialBackoff::default();
        assert_eq!(backoff.ceiling(1), Duration::from_secs(1));
        assert_eq!(backoff.ceiling(2), Duration::from_secs(2));
        assert_eq!(backoff.ceiling(4), Duration::from_secs(8));
        assert_eq!(backoff.ceiling(6), Duration::from_secs(20));
        assert_eq!(backoff.ceiling(100), Duration::from_secs(20));
    }

    #[test]
    fn test_jittered_delay_within_ceiling() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_millis(80));
        for attempt in 1..10 {
            assert!(backoff.delay(attempt) <= backoff.ceiling(attempt));
        }
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = FixedBackoff(Duration::from_millis(5));
        assert_eq!(backoff.delay(1), Duration::from_millis(5));
        assert_eq!(backoff.delay(9), Duration::from_millis(5));
    }
}
