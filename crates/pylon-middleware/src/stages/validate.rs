//! Validate middleware.

use crate::middleware::{Middleware, Next};
use crate::stack::Stage;
use pylon_core::codec::Validator;
use pylon_core::{BoxFuture, OperationContext, Output};
use std::sync::Arc;

/// Middleware validating the typed input before it is built.
///
/// The validator only runs when validation is enabled and the operation has
/// one. Its error is surfaced unchanged and ends the call.
pub struct ValidateMiddleware<I> {
    validator: Option<Arc<dyn Validator<I>>>,
    enabled: bool,
}

impl<I> ValidateMiddleware<I> {
    /// Creates the middleware.
    pub fn new(validator: Option<Arc<dyn Validator<I>>>, enabled: bool) -> Self {
        Self { validator, enabled }
    }
}

impl<I> std::fmt::Debug for ValidateMiddleware<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidateMiddleware")
            .field("has_validator", &self.validator.is_some())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<I, O> Middleware<I, O> for ValidateMiddleware<I>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        Stage::Validate.name()
    }

    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>> {
        Box::pin(async move {
            if let (true, Some(validator)) = (self.enabled, &self.validator) {
                if let Err(err) = validator.validate(input, "input") {
                    tracing::debug!(parent: ctx.span(), error = %err, "input validation failed");
                    return Output::from_error(err);
                }
            }
            next.run(input, ctx).await
        })
    }
}
