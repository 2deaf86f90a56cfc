//! Initialize middleware.
//!
//! The outermost layer. It runs the execution-level hooks around the whole
//! call and records the operation metrics once the call has finished.

use super::invoke_hook;
use crate::middleware::{Middleware, Next};
use crate::stack::Stage;
use pylon_core::{BoxFuture, Hook, OperationContext, Output, PipelineError};
use pylon_telemetry::metrics;

/// Middleware wrapping the whole call.
///
/// # Behavior
///
/// 1. `read_before_execution`; a failure skips every later layer
/// 2. Runs the rest of the stack
/// 3. `modify_before_completion`, then `read_after_execution`; either failure
///    replaces the output
/// 4. Records `pylon_operations_total` and the call duration
#[derive(Debug, Clone, Copy, Default)]
pub struct InitializeMiddleware;

impl InitializeMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<I, O> Middleware<I, O> for InitializeMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        Stage::Initialize.name()
    }

    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>> {
        Box::pin(async move {
            tracing::debug!(parent: ctx.span(), "operation started");

            let mut output = match invoke_hook(ctx, Hook::ReadBeforeExecution, input) {
                Ok(()) => next.run(input, ctx).await,
                Err(err) => Output::from_error(err),
            };

            if let Err(err) =
                ctx.invoke_interceptors(Hook::ModifyBeforeCompletion, input, Some(&mut output))
            {
                output.fail(err);
            }
            if let Err(err) =
                ctx.invoke_interceptors(Hook::ReadAfterExecution, input, Some(&mut output))
            {
                output.fail(err);
            }

            let elapsed = ctx.elapsed();
            metrics::record_operation(ctx.operation_name(), outcome(&output), elapsed);

            match &output.error {
                Some(err) => tracing::debug!(
                    parent: ctx.span(),
                    error = %err,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "operation failed"
                ),
                None => tracing::debug!(
                    parent: ctx.span(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "operation succeeded"
                ),
            }

            output
        })
    }
}

/// Metric label for the outcome of a call.
fn outcome<O>(output: &Output<O>) -> &'static str {
    match &output.error {
        None => "success",
        Some(PipelineError::Auth { .. }) => "auth",
        Some(PipelineError::Validation(_)) => "validation",
        Some(PipelineError::Build(_)) => "build",
        Some(PipelineError::Signing(_)) => "signing",
        Some(PipelineError::Transport(_)) => "transport",
        Some(PipelineError::Service(_)) => "service",
        Some(PipelineError::Parse(_)) => "parse",
        Some(PipelineError::Interceptor(_) | PipelineError::Interceptors(_)) => "interceptor",
        Some(PipelineError::Cancelled) => "cancelled",
        Some(PipelineError::TimedOut(_)) => "timed_out",
        Some(
            PipelineError::MissingAuth
            | PipelineError::MissingResponse
            | PipelineError::StackExhausted,
        ) => "internal",
    }
}
