//! Per-call options.

use pylon_core::{CancelSignal, Interceptor, InterceptorList};
use std::sync::Arc;
use std::time::Duration;

/// Options for a single [`Client::call`](crate::Client::call).
///
/// # Example
///
/// ```
/// use pylon::CallOptions;
/// use pylon_core::CancelSignal;
/// use std::time::Duration;
///
/// let cancel = CancelSignal::new();
/// let options = CallOptions::new()
///     .with_cancel_signal(cancel.clone())
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(options.timeout(), Some(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    interceptors: InterceptorList,
    cancel: Option<CancelSignal>,
    timeout: Option<Duration>,
}

impl CallOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an interceptor that runs after the client's own.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Adds a shared interceptor that runs after the client's own.
    #[must_use]
    pub fn with_interceptor_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Sets the signal the caller uses to cancel the call.
    #[must_use]
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sets the send timeout, overriding `http.operation_timeout_ms`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the per-call interceptors.
    #[must_use]
    pub fn interceptors(&self) -> &InterceptorList {
        &self.interceptors
    }

    /// Returns the timeout override.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn cancel_signal(&self) -> Option<CancelSignal> {
        self.cancel.clone()
    }
}
