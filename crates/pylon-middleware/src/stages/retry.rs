//! Retry middleware.
//!
//! Wraps the per-attempt layers (Sign, Parse, Send) in an attempt loop. Every
//! call gets a fresh [`RetryState`] and [`RetryQuota`]; nothing is shared
//! between calls.

use super::invoke_hook;
use crate::middleware::{Middleware, Next};
use crate::retry::{
    AttemptResult, Backoff, ExponentialBackoff, RetryConfig, RetryDecision, RetryPolicy,
    RetryQuota, StandardRetryPolicy,
};
use crate::stack::Stage;
use pylon_core::{
    BoxFuture, Hook, OperationContext, Output, PipelineError, RetryPhase, RetryState,
};
use pylon_telemetry::metrics;
use std::sync::Arc;

/// Middleware re-running the attempt layers until the policy stops it.
///
/// # Behavior
///
/// 1. `modify_before_retry_loop`
/// 2. Per attempt: `read_before_attempt`, the attempt layers,
///    `modify_before_attempt_completion` and `read_after_attempt`
/// 3. The policy classifies the attempt. `DoNotRetry` ends the call as
///    `Succeeded` (refunding the quota) or `FatalError`
/// 4. A retry stops as `Exhausted` at the attempt limit or when the quota
///    cannot pay for it; otherwise the layer waits, resets the signer and
///    response, and runs the next attempt
///
/// A `Retry-After` hint replaces the back-off delay but never exceeds
/// [`RetryConfig::max_retry_after`].
///
/// Cancellation during the wait ends the call with
/// [`PipelineError::Cancelled`].
#[derive(Clone)]
pub struct RetryMiddleware {
    policy: Arc<dyn RetryPolicy>,
    backoff: Arc<dyn Backoff>,
    config: RetryConfig,
}

impl RetryMiddleware {
    /// Creates the middleware.
    pub fn new(policy: Arc<dyn RetryPolicy>, backoff: Arc<dyn Backoff>, config: RetryConfig) -> Self {
        Self {
            policy,
            backoff,
            config,
        }
    }

    /// The standard policy with exponential back-off and `config`.
    #[must_use]
    pub fn standard(config: RetryConfig) -> Self {
        Self::new(
            Arc::new(StandardRetryPolicy),
            Arc::new(ExponentialBackoff::default()),
            config,
        )
    }

    /// Returns the retry settings.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Prepares the context for another attempt.
    fn reset(ctx: &mut OperationContext) {
        if let Some(auth) = ctx.auth().cloned() {
            auth.signer.reset(ctx.request_mut(), &auth.signer_properties);
        }
        ctx.clear_response();
    }

    fn finish(ctx: &mut OperationContext, quota: &RetryQuota, phase: RetryPhase) {
        let retry = ctx.retry_mut();
        retry.phase = phase;
        retry.quota_balance = quota.available();
    }
}

impl std::fmt::Debug for RetryMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryMiddleware")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<I, O> Middleware<I, O> for RetryMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        Stage::Retry.name()
    }

    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>> {
        Box::pin(async move {
            if let Err(err) = invoke_hook(ctx, Hook::ModifyBeforeRetryLoop, input) {
                return Output::from_error(err);
            }

            let mut quota = RetryQuota::new(self.config.quota);
            let max_attempts = self.config.max_attempts.max(1);
            *ctx.retry_mut() = RetryState {
                quota_balance: quota.available(),
                ..RetryState::default()
            };

            loop {
                let attempt = {
                    let retry = ctx.retry_mut();
                    retry.attempts += 1;
                    retry.phase = RetryPhase::Attempting;
                    retry.attempts
                };
                metrics::record_attempt(ctx.operation_name());

                let mut output = match invoke_hook(ctx, Hook::ReadBeforeAttempt, input) {
                    Ok(()) => next.run(input, ctx).await,
                    Err(err) => Output::from_error(err),
                };
                for hook in [Hook::ModifyBeforeAttemptCompletion, Hook::ReadAfterAttempt] {
                    if let Err(err) = ctx.invoke_interceptors(hook, input, Some(&mut output)) {
                        output.fail(err);
                    }
                }

                let decision = match &output.error {
                    Some(err) if err.is_cancellation() => RetryDecision::DoNotRetry,
                    error => self.policy.classify(&AttemptResult {
                        attempt,
                        error: error.as_ref(),
                        response: ctx.response(),
                    }),
                };

                let (kind, retry_after) = match decision {
                    RetryDecision::DoNotRetry => {
                        let phase = if output.error.is_none() {
                            quota.release();
                            RetryPhase::Succeeded
                        } else {
                            RetryPhase::FatalError
                        };
                        Self::finish(ctx, &quota, phase);
                        return output;
                    }
                    RetryDecision::Retry { kind, retry_after } => (kind, retry_after),
                };

                if attempt >= max_attempts {
                    tracing::debug!(parent: ctx.span(), attempt, "retry attempts exhausted");
                    Self::finish(ctx, &quota, RetryPhase::Exhausted);
                    return output;
                }
                if !quota.acquire(kind) {
                    tracing::debug!(
                        parent: ctx.span(),
                        attempt,
                        available = quota.available(),
                        "retry quota exhausted"
                    );
                    Self::finish(ctx, &quota, RetryPhase::Exhausted);
                    return output;
                }
                ctx.retry_mut().quota_balance = quota.available();

                let delay = match retry_after {
                    Some(hint) => hint.min(self.config.max_retry_after),
                    None => self.backoff.delay(attempt),
                };
                metrics::record_retry(ctx.operation_name(), &kind.to_string());
                if let Some(err) = &output.error {
                    tracing::debug!(
                        parent: ctx.span(),
                        attempt,
                        kind = %kind,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying attempt"
                    );
                }
                drop(output);

                let cancel = ctx.cancel_signal().clone();
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = cancel.cancelled() => {
                        ctx.retry_mut().phase = RetryPhase::FatalError;
                        return Output::from_error(PipelineError::Cancelled);
                    }
                }
                ctx.retry_mut().total_delay += delay;
                Self::reset(ctx);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnMiddleware;
    use crate::retry::{FixedBackoff, QuotaConfig};
    use crate::stack::MiddlewareStack;
    use pylon_core::error_parser::ErrorKind;
    use pylon_core::{CancelSignal, TransportError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` attempts with a transport error.
    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> FnMiddleware<(), u32> {
        FnMiddleware::new("flaky", move |_input: &mut (), ctx, _next| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let stale = ctx.response().is_some();
            ctx.set_response(http::Response::new(bytes::Bytes::new()));
            let output = if stale {
                Output::from_error(PipelineError::build("response leaked between attempts"))
            } else if n <= failures {
                Output::from_error(TransportError::connect("connection reset"))
            } else {
                Output::from_data(n)
            };
            Box::pin(async move { output })
        })
    }

    fn stack(retry: RetryMiddleware, attempt: FnMiddleware<(), u32>) -> MiddlewareStack<(), u32> {
        MiddlewareStack::builder().layer(retry).layer(attempt).build()
    }

    fn retry(max_attempts: u32) -> RetryMiddleware {
        RetryMiddleware::new(
            Arc::new(StandardRetryPolicy),
            Arc::new(FixedBackoff(Duration::ZERO)),
            RetryConfig::default().with_max_attempts(max_attempts),
        )
    }

    #[tokio::test]
    async fn test_two_transient_failures_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut ctx = OperationContext::new("Op");

        let output = stack(retry(3), flaky(2, calls.clone())).call(&mut (), &mut ctx).await;

        assert!(output.error.is_none());
        assert_eq!(output.data, Some(3));
        assert_eq!(ctx.retry().attempts, 3);
        assert_eq!(ctx.retry().phase, RetryPhase::Succeeded);
        assert_eq!(ctx.retry().quota_balance, 495);
    }

    #[tokio::test]
    async fn test_exhausted_surfaces_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut ctx = OperationContext::new("Op");

        let output = stack(retry(2), flaky(5, calls.clone())).call(&mut (), &mut ctx).await;

        assert!(matches!(output.error, Some(PipelineError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.retry().phase, RetryPhase::Exhausted);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let attempt = FnMiddleware::<(), u32>::new("fatal", move |_input, _ctx, _next| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Output::from_error(PipelineError::parse("bad body")) })
        });
        let mut ctx = OperationContext::new("Op");

        let output = stack(retry(3), attempt).call(&mut (), &mut ctx).await;

        assert!(matches!(output.error, Some(PipelineError::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.retry().phase, RetryPhase::FatalError);
    }

    #[tokio::test]
    async fn test_quota_limits_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let retry = RetryMiddleware::new(
            Arc::new(StandardRetryPolicy),
            Arc::new(FixedBackoff(Duration::ZERO)),
            RetryConfig {
                max_attempts: 10,
                quota: QuotaConfig {
                    initial: 7,
                    ..QuotaConfig::default()
                },
                ..RetryConfig::default()
            },
        );
        let mut ctx = OperationContext::new("Op");

        let output = stack(retry, flaky(10, calls.clone())).call(&mut (), &mut ctx).await;

        assert!(output.is_error());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.retry().phase, RetryPhase::Exhausted);
        assert_eq!(ctx.retry().quota_balance, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_overrides_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = |attempt: &AttemptResult<'_>| match attempt.error {
            Some(_) => RetryDecision::Retry {
                kind: ErrorKind::Throttling,
                retry_after: Some(Duration::from_secs(5)),
            },
            None => RetryDecision::DoNotRetry,
        };
        let retry = RetryMiddleware::new(
            Arc::new(policy),
            Arc::new(FixedBackoff(Duration::from_secs(60))),
            RetryConfig::default(),
        );
        let mut ctx = OperationContext::new("Op");

        let output = stack(retry, flaky(1, calls)).call(&mut (), &mut ctx).await;

        assert_eq!(output.data, Some(2));
        assert_eq!(ctx.retry().total_delay, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_is_capped() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = |attempt: &AttemptResult<'_>| match attempt.error {
            Some(_) => RetryDecision::Retry {
                kind: ErrorKind::Throttling,
                retry_after: Some(Duration::from_secs(86_400)),
            },
            None => RetryDecision::DoNotRetry,
        };
        let retry = RetryMiddleware::new(
            Arc::new(policy),
            Arc::new(FixedBackoff(Duration::ZERO)),
            RetryConfig::default().with_max_retry_after(Duration::from_secs(20)),
        );
        let mut ctx = OperationContext::new("Op");

        let output = stack(retry, flaky(1, calls)).call(&mut (), &mut ctx).await;

        assert_eq!(output.data, Some(2));
        assert_eq!(ctx.retry().total_delay, Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancelSignal::new();
        let retry = RetryMiddleware::new(
            Arc::new(StandardRetryPolicy),
            Arc::new(FixedBackoff(Duration::from_secs(60))),
            RetryConfig::default(),
        );
        let mut ctx = OperationContext::new("Op").with_cancel_signal(cancel.clone());

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });
        let output = stack(retry, flaky(5, calls.clone())).call(&mut (), &mut ctx).await;
        trigger.await.unwrap();

        assert!(matches!(output.error, Some(PipelineError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
