//! Per-call cancellation.
//!
//! A [`CancelSignal`] is created for every call and stored on the
//! [`OperationContext`](crate::OperationContext). The caller keeps a clone and
//! may trigger it at any time; the pipeline honours it at the Send boundary and
//! during retry back-off waits.

use std::sync::Arc;
use tokio::sync::watch;

/// A signal that can be used to cancel an in-flight call.
///
/// All clones observe the same state. Triggering is idempotent.
///
/// # Example
///
/// ```rust
/// use pylon_core::CancelSignal;
///
/// let cancel = CancelSignal::new();
/// let caller_handle = cancel.clone();
///
/// caller_handle.cancel();
/// assert!(cancel.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancelSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    /// Creates a signal that has not been triggered.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Triggers cancellation and wakes every waiter.
    pub fn cancel(&self) {
        self.sender.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        });
    }

    /// Returns `true` if cancellation has been triggered.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes once cancellation is triggered.
    ///
    /// Completes immediately if the signal was already triggered.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so `wait_for` only returns once
        // the value flips to true.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}
