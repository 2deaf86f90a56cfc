//! Build middleware.
//!
//! Turns the typed input into the transport request using the operation's
//! [`RequestBuilder`], wrapped by the serialization hooks:
//!
//! ```text
//! modify_before_serialization -> read_before_serialization
//!     -> builder -> read_after_serialization -> next layer
//! ```
//!
//! The first failure ends the call; later steps and layers are skipped.

use super::invoke_hook;
use crate::middleware::{Middleware, Next};
use crate::stack::Stage;
use pylon_core::codec::RequestBuilder;
use pylon_core::{BoxFuture, Hook, OperationContext, Output, PipelineError};
use std::sync::Arc;

/// Middleware building the transport request.
pub struct BuildMiddleware<I> {
    builder: Arc<dyn RequestBuilder<I>>,
}

impl<I: Send + 'static> BuildMiddleware<I> {
    /// Creates the middleware around the operation's builder.
    pub fn new(builder: Arc<dyn RequestBuilder<I>>) -> Self {
        Self { builder }
    }

    fn serialize(&self, input: &mut I, ctx: &mut OperationContext) -> Result<(), PipelineError> {
        invoke_hook(ctx, Hook::ModifyBeforeSerialization, input)?;
        invoke_hook(ctx, Hook::ReadBeforeSerialization, input)?;
        self.builder.build(ctx.request_mut(), input)?;
        invoke_hook(ctx, Hook::ReadAfterSerialization, input)
    }
}

impl<I> std::fmt::Debug for BuildMiddleware<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildMiddleware").finish_non_exhaustive()
    }
}

impl<I, O> Middleware<I, O> for BuildMiddleware<I>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        Stage::Build.name()
    }

    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>> {
        Box::pin(async move {
            if let Err(err) = self.serialize(input, ctx) {
                tracing::debug!(parent: ctx.span(), error = %err, "request build failed");
                return Output::from_error(err);
            }
            next.run(input, ctx).await
        })
    }
}
