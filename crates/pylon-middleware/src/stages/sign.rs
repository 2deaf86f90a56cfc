//! Sign middleware.

use super::invoke_hook;
use crate::middleware::{Middleware, Next};
use crate::stack::Stage;
use pylon_core::{BoxFuture, Hook, OperationContext, Output, PipelineError};

/// Middleware applying the resolved signer to the request.
///
/// Runs once per attempt, so a retried request is signed again after the
/// Retry layer reset it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignMiddleware;

impl SignMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn sign<I: Send + 'static>(
        input: &mut I,
        ctx: &mut OperationContext,
    ) -> Result<(), PipelineError> {
        invoke_hook(ctx, Hook::ModifyBeforeSigning, input)?;
        invoke_hook(ctx, Hook::ReadBeforeSigning, input)?;

        let auth = ctx.auth().cloned().ok_or(PipelineError::MissingAuth)?;
        auth.signer
            .sign(ctx.request_mut(), &auth.identity, &auth.signer_properties)?;

        invoke_hook(ctx, Hook::ReadAfterSigning, input)
    }
}

impl<I, O> Middleware<I, O> for SignMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        Stage::Sign.name()
    }

    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>> {
        Box::pin(async move {
            if let Err(err) = Self::sign(input, ctx) {
                tracing::debug!(parent: ctx.span(), error = %err, "signing failed");
                return Output::from_error(err);
            }
            next.run(input, ctx).await
        })
    }
}
