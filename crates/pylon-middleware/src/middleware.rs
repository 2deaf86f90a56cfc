//! Core middleware trait and types.
//!
//! Every layer of the pipeline implements [`Middleware`]. A layer receives the
//! typed input, the [`OperationContext`] and a [`Next`] handle for the rest of
//! the stack, and returns the [`Output`] of the traversal.
//!
//! # Example
//!
//! ```
//! use pylon_core::{BoxFuture, OperationContext, Output};
//! use pylon_middleware::{Middleware, Next};
//!
//! struct Logging;
//!
//! impl<I: Send + 'static, O: Send + 'static> Middleware<I, O> for Logging {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn call<'a>(
//!         &'a self,
//!         input: &'a mut I,
//!         ctx: &'a mut OperationContext,
//!         next: Next<'a, I, O>,
//!     ) -> BoxFuture<'a, Output<O>> {
//!         Box::pin(async move {
//!             tracing::debug!(operation = ctx.operation_name(), "calling");
//!             let output = next.run(input, ctx).await;
//!             tracing::debug!(failed = output.is_error(), "done");
//!             output
//!         })
//!     }
//! }
//! ```

use pylon_core::{BoxFuture, OperationContext, Output, PipelineError};
use std::sync::Arc;

/// A layer of the pipeline.
///
/// # Invariants
///
/// - A layer calls `next.run()` at most once, except Retry which re-runs it
///   once per attempt
/// - A layer that fails returns an `Output` carrying the error instead of
///   calling `next`
pub trait Middleware<I, O>: Send + Sync + 'static {
    /// Returns the unique name of this layer within a stack.
    fn name(&self) -> &'static str;

    /// Runs this layer.
    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>>;
}

/// Handle to the layers below the current one.
///
/// `Next` is `Copy`, so a layer may run the rest of the stack more than once.
pub struct Next<'a, I, O> {
    remaining: &'a [Arc<dyn Middleware<I, O>>],
}

impl<I, O> Clone for Next<'_, I, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, O> Copy for Next<'_, I, O> {}

impl<'a, I, O> Next<'a, I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a handle over `remaining`.
    pub fn new(remaining: &'a [Arc<dyn Middleware<I, O>>]) -> Self {
        Self { remaining }
    }

    /// Returns the number of layers left.
    #[must_use]
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    /// Returns true if no layer is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Runs the next layer.
    ///
    /// Running past the last layer yields [`PipelineError::StackExhausted`].
    pub fn run<'b>(self, input: &'b mut I, ctx: &'b mut OperationContext) -> BoxFuture<'b, Output<O>>
    where
        'a: 'b,
    {
        match self.remaining.split_first() {
            Some((layer, rest)) => layer.call(input, ctx, Next { remaining: rest }),
            None => Box::pin(async { Output::from_error(PipelineError::StackExhausted) }),
        }
    }
}

type LayerFn<I, O> = dyn for<'a> Fn(&'a mut I, &'a mut OperationContext, Next<'a, I, O>) -> BoxFuture<'a, Output<O>>
    + Send
    + Sync;

/// A layer built from a closure.
///
/// # Example
///
/// ```
/// use pylon_core::OperationContext;
/// use pylon_middleware::FnMiddleware;
///
/// let tag = FnMiddleware::<String, ()>::new("tag", |input, ctx, next| {
///     Box::pin(async move {
///         input.push_str("-tagged");
///         next.run(input, ctx).await
///     })
/// });
/// ```
pub struct FnMiddleware<I, O> {
    name: &'static str,
    func: Box<LayerFn<I, O>>,
}

impl<I, O> FnMiddleware<I, O> {
    /// Creates a named closure layer.
    pub fn new<F>(name: &'static str, func: F) -> Self
    where
        F: for<'a> Fn(&'a mut I, &'a mut OperationContext, Next<'a, I, O>) -> BoxFuture<'a, Output<O>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            func: Box::new(func),
        }
    }
}

impl<I, O> Middleware<I, O> for FnMiddleware<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>> {
        (self.func)(input, ctx, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Push(&'static str);

    impl Middleware<Vec<&'static str>, usize> for Push {
        fn name(&self) -> &'static str {
            self.0
        }

        fn call<'a>(
            &'a self,
            input: &'a mut Vec<&'static str>,
            ctx: &'a mut OperationContext,
            next: Next<'a, Vec<&'static str>, usize>,
        ) -> BoxFuture<'a, Output<usize>> {
            Box::pin(async move {
                input.push(self.0);
                next.run(input, ctx).await
            })
        }
    }

    fn terminal() -> Arc<dyn Middleware<Vec<&'static str>, usize>> {
        Arc::new(FnMiddleware::<Vec<&'static str>, usize>::new("terminal", |input, _ctx, _next| {
            let len = input.len();
            Box::pin(async move { Output::from_data(len) })
        }))
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let layers: Vec<Arc<dyn Middleware<Vec<&'static str>, usize>>> =
            vec![Arc::new(Push("first")), Arc::new(Push("second")), terminal()];
        let mut input = Vec::new();
        let mut ctx = OperationContext::new("Op");

        let output = Next::new(&layers).run(&mut input, &mut ctx).await;

        assert_eq!(input, vec!["first", "second"]);
        assert_eq!(output.data, Some(2));
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let layers: Vec<Arc<dyn Middleware<Vec<&'static str>, usize>>> = vec![Arc::new(Push("only"))];
        let mut input = Vec::new();
        let mut ctx = OperationContext::new("Op");

        let output = Next::new(&layers).run(&mut input, &mut ctx).await;

        assert!(matches!(output.error, Some(PipelineError::StackExhausted)));
    }

    #[tokio::test]
    async fn test_next_can_run_twice() {
        let twice: Arc<dyn Middleware<Vec<&'static str>, usize>> =
            Arc::new(FnMiddleware::<Vec<&'static str>, usize>::new("twice", |input, ctx, next| {
                Box::pin(async move {
                    let _ = next.run(input, ctx).await;
                    next.run(input, ctx).await
                })
            }));
        let layers: Vec<Arc<dyn Middleware<Vec<&'static str>, usize>>> =
            vec![twice, Arc::new(Push("inner")), terminal()];
        let mut input = Vec::new();
        let mut ctx = OperationContext::new("Op");

        let output = Next::new(&layers).run(&mut input, &mut ctx).await;

        assert_eq!(input, vec!["inner", "inner"]);
        assert_eq!(output.data, Some(2));
    }
}
