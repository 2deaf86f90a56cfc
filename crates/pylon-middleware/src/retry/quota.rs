//! Per-call retry token quota.

use pylon_core::error_parser::ErrorKind;

/// Token costs of the retry quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaConfig {
    /// Tokens available at the start of a call.
    pub initial: u32,
    /// Cost of retrying any failure other than a timeout.
    pub retry_cost: u32,
    /// Cost of retrying a timeout.
    pub timeout_retry_cost: u32,
    /// Tokens returned by a success that needed no retry.
    pub no_retry_increment: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            initial: 500,
            retry_cost: 5,
            timeout_retry_cost: 10,
            no_retry_increment: 1,
        }
    }
}

/// Token bucket paying for retries.
///
/// A retry spends tokens; a successful attempt refunds the cost of the last
/// retry, or `no_retry_increment` if nothing was retried. The balance never
/// exceeds the initial amount.
///
/// # Example
///
/// ```
/// use pylon_core::error_parser::ErrorKind;
/// use pylon_middleware::retry::{QuotaConfig, RetryQuota};
///
/// let mut quota = RetryQuota::new(QuotaConfig::default());
/// assert!(quota.acquire(ErrorKind::Transient));
/// assert_eq!(quota.available(), 495);
///
/// quota.release();
/// assert_eq!(quota.available(), 500);
/// ```
#[derive(Debug, Clone)]
pub struct RetryQuota {
    config: QuotaConfig,
    available: u32,
    last_cost: Option<u32>,
}

impl RetryQuota {
    /// Creates a full quota.
    #[must_use]
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            config,
            available: config.initial,
            last_cost: None,
        }
    }

    /// Returns the current balance.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.available
    }

    /// Tries to pay for a retry of `kind`. Returns false if the balance is
    /// too low, leaving it unchanged.
    pub fn acquire(&mut self, kind: ErrorKind) -> bool {
        let cost = match kind {
            ErrorKind::Timeout => self.config.timeout_retry_cost,
            _ => self.config.retry_cost,
        };
        if self.available < cost {
            return false;
        }
        self.available -= cost;
        self.last_cost = Some(cost);
        true
    }

    /// Refunds tokens after a successful attempt.
    pub fn release(&mut self) {
        let refund = self
            .last_cost
            .take()
            .unwrap_or(self.config.no_retry_increment);
        self.available = self
            .available
            .saturating_add(refund)
            .min(self.config.initial);
    }
}
