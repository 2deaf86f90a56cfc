//! Retry policy, back-off and token quota used by the Retry layer.
//!
//! - [`RetryPolicy`] classifies a finished attempt
//! - [`Backoff`] computes the wait before the next attempt
//! - [`RetryQuota`] limits how many retries one call may spend

mod backoff;
mod policy;
mod quota;

pub use backoff::{Backoff, ExponentialBackoff, FixedBackoff};
pub use policy::{AttemptResult, RetryDecision, RetryPolicy, StandardRetryPolicy};
pub use quota::{QuotaConfig, RetryQuota};

use std::time::Duration;

/// Default maximum number of attempts, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default ceiling for a service-provided `Retry-After` wait.
pub const DEFAULT_MAX_RETRY_AFTER: Duration = Duration::from_secs(20);

/// Settings of the Retry layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Longest wait a `Retry-After` hint may impose before the next attempt.
    pub max_retry_after: Duration,
    /// Token quota settings.
    pub quota: QuotaConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_retry_after: DEFAULT_MAX_RETRY_AFTER,
            quota: QuotaConfig::default(),
        }
    }
}

impl RetryConfig {
    /// Returns a config that makes exactly one attempt.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the ceiling for `Retry-After` waits.
    #[must_use]
    pub fn with_max_retry_after(mut self, max_retry_after: Duration) -> Self {
        self.max_retry_after = max_retry_after;
        self
    }
}
