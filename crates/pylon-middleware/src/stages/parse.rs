//! Parse middleware.
//!
//! Calls the rest of the stack first, then turns the transport response into
//! a typed output or a modeled error on the way back:
//!
//! ```text
//! next layer -> modify_before_deserialization -> read_before_deserialization
//!     -> error parser -> data parser -> read_after_deserialization
//! ```
//!
//! Error-first: once the error parser recognises an error the data parser
//! never runs.

use crate::middleware::{Middleware, Next};
use crate::stack::Stage;
use pylon_core::codec::{DataParser, ErrorParser};
use pylon_core::{BoxFuture, Hook, OperationContext, Output, PipelineError};
use std::sync::Arc;

/// Middleware parsing the transport response.
pub struct ParseMiddleware<O> {
    error_parser: Arc<dyn ErrorParser>,
    data_parser: Arc<dyn DataParser<O>>,
}

impl<O: Send + 'static> ParseMiddleware<O> {
    /// Creates the middleware around the operation's parsers.
    pub fn new(error_parser: Arc<dyn ErrorParser>, data_parser: Arc<dyn DataParser<O>>) -> Self {
        Self {
            error_parser,
            data_parser,
        }
    }

    fn deserialize(&self, ctx: &OperationContext) -> Result<O, PipelineError> {
        let response = ctx.response().ok_or(PipelineError::MissingResponse)?;
        if let Some(err) = self.error_parser.parse(response, ctx.metadata()) {
            return Err(PipelineError::Service(err));
        }
        Ok(self.data_parser.parse(response)?)
    }
}

impl<O> std::fmt::Debug for ParseMiddleware<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseMiddleware").finish_non_exhaustive()
    }
}

impl<I, O> Middleware<I, O> for ParseMiddleware<O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        Stage::Parse.name()
    }

    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>> {
        Box::pin(async move {
            let mut output = next.run(input, ctx).await;
            if output.error.as_ref().is_some_and(PipelineError::is_cancellation) {
                return output;
            }

            for hook in [Hook::ModifyBeforeDeserialization, Hook::ReadBeforeDeserialization] {
                if let Err(err) = ctx.invoke_interceptors(hook, input, Some(&mut output)) {
                    output.fail(err);
                    return output;
                }
            }

            if output.error.is_none() {
                match self.deserialize(ctx) {
                    Ok(data) => output.data = Some(data),
                    Err(err) => {
                        tracing::debug!(parent: ctx.span(), error = %err, "response parsed as error");
                        output.fail(err);
                    }
                }
            }

            if let Err(err) =
                ctx.invoke_interceptors(Hook::ReadAfterDeserialization, input, Some(&mut output))
            {
                output.fail(err);
            }
            output
        })
    }
}
