//! Attempt classification.

use pylon_core::error_parser::{ErrorInspector, ErrorKind};
use pylon_core::{HttpResponse, PipelineError};
use std::time::Duration;

/// What a finished attempt produced.
#[derive(Debug, Clone, Copy)]
pub struct AttemptResult<'a> {
    /// 1-based attempt number.
    pub attempt: u32,
    /// The attempt's error, if it failed.
    pub error: Option<&'a PipelineError>,
    /// The attempt's transport response, if one arrived.
    pub response: Option<&'a HttpResponse>,
}

/// Outcome of classifying an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop: the attempt succeeded or failed fatally.
    DoNotRetry,
    /// Retry the attempt.
    Retry {
        /// The kind of failure, which decides the quota cost.
        kind: ErrorKind,
        /// Service-provided wait that overrides the back-off delay.
        retry_after: Option<Duration>,
    },
}

/// Decides whether an attempt is retried.
pub trait RetryPolicy: Send + Sync + 'static {
    /// Classifies a finished attempt.
    fn classify(&self, attempt: &AttemptResult<'_>) -> RetryDecision;
}

impl<F> RetryPolicy for F
where
    F: Fn(&AttemptResult<'_>) -> RetryDecision + Send + Sync + 'static,
{
    fn classify(&self, attempt: &AttemptResult<'_>) -> RetryDecision {
        self(attempt)
    }
}

/// Retries throttling, timeouts, transient failures and transient server
/// statuses; honours `Retry-After`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRetryPolicy;

impl RetryPolicy for StandardRetryPolicy {
    fn classify(&self, attempt: &AttemptResult<'_>) -> RetryDecision {
        let Some(error) = attempt.error else {
            return RetryDecision::DoNotRetry;
        };
        if error.is_cancellation() {
            return RetryDecision::DoNotRetry;
        }

        let inspector = ErrorInspector::new(error, attempt.response);
        match inspector.error_kind() {
            Some(kind) => RetryDecision::Retry {
                kind,
                retry_after: inspector.retry_after_hint(),
            },
            None => RetryDecision::DoNotRetry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pylon_core::{ApiError, TransportError};

    fn classify(error: Option<&PipelineError>, response: Option<&HttpResponse>) -> RetryDecision {
        StandardRetryPolicy.classify(&AttemptResult {
            attempt: 1,
            error,
            response,
        })
    }

    #[test]
    fn test_success_is_not_retried() {
        assert_eq!(classify(None, None), RetryDecision::DoNotRetry);
    }

    #[test]
    fn test_transport_errors_are_retried() {
        let err = PipelineError::Transport(TransportError::connect("refused"));
        assert_eq!(
            classify(Some(&err), None),
            RetryDecision::Retry {
                kind: ErrorKind::Transient,
                retry_after: None
            }
        );

        let err = PipelineError::Transport(TransportError::timeout("slow"));
        assert!(matches!(
            classify(Some(&err), None),
            RetryDecision::Retry {
                kind: ErrorKind::Timeout,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_request_is_not_retried() {
        let err = PipelineError::Transport(TransportError::malformed("builder error"));
        assert_eq!(classify(Some(&err), None), RetryDecision::DoNotRetry);
    }

    #[test]
    fn test_throttling_honours_retry_after() {
        let response = http::Response::builder()
            .status(429)
            .header("retry-after", "3")
            .body(Bytes::new())
            .unwrap();
        let err = PipelineError::Service(ApiError::new("TooManyRequests", "slow down").with_status(429));

        assert_eq!(
            classify(Some(&err), Some(&response)),
            RetryDecision::Retry {
                kind: ErrorKind::Throttling,
                retry_after: Some(Duration::from_secs(3))
            }
        );
    }

    #[test]
    fn test_fatal_errors_are_not_retried() {
        let err = PipelineError::validation("input", "bad");
        assert_eq!(classify(Some(&err), None), RetryDecision::DoNotRetry);

        let err = PipelineError::Cancelled;
        assert_eq!(classify(Some(&err), None), RetryDecision::DoNotRetry);

        let err = PipelineError::Service(ApiError::new("NotFound", "missing").with_status(404));
        assert_eq!(classify(Some(&err), None), RetryDecision::DoNotRetry);
    }

    #[test]
    fn test_closure_policy() {
        let never = |_: &AttemptResult<'_>| RetryDecision::DoNotRetry;
        let err = PipelineError::Transport(TransportError::connect("refused"));
        let attempt = AttemptResult {
            attempt: 1,
            error: Some(&err),
            response: None,
        };
        assert_eq!(never.classify(&attempt), RetryDecision::DoNotRetry);
    }
}
