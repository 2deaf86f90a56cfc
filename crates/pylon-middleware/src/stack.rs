//! Ordered middleware stack.
//!
//! A [`MiddlewareStack`] is an immutable, ordered list of layers built once
//! per operation and invoked once per call. The standard stack has eight
//! stages in a fixed order:
//!
//! 1. **Initialize** - Execution-level hooks and operation telemetry
//! 2. **Validate** - Optional input validation
//! 3. **Build** - Typed input to transport request
//! 4. **Auth** - Auth option resolution
//! 5. **Retry** - Attempt loop with back-off and quota
//! 6. **Sign** - Applies the resolved signer (once per attempt)
//! 7. **Parse** - Transport response to typed output or error (once per attempt)
//! 8. **Send** - Transport dispatch (once per attempt)
//!
//! [`StackBuilder`] composes stacks by name, so a plugin can insert a layer
//! next to a standard stage or remove one.

use crate::middleware::{Middleware, Next};
use pylon_core::{OperationContext, Output};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A type-erased layer that can be stored in a stack.
pub type BoxedMiddleware<I, O> = Arc<dyn Middleware<I, O>>;

/// The standard pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: Execution hooks and telemetry
    Initialize = 1,
    /// Stage 2: Input validation
    Validate = 2,
    /// Stage 3: Request building
    Build = 3,
    /// Stage 4: Auth resolution
    Auth = 4,
    /// Stage 5: Retry loop
    Retry = 5,
    /// --- Per attempt ---
    /// Stage 6: Signing
    Sign = 6,
    /// Stage 7: Response parsing
    Parse = 7,
    /// Stage 8: Transport dispatch
    Send = 8,
}

impl Stage {
    /// Returns true if this stage runs once per attempt.
    #[must_use]
    pub const fn is_per_attempt(self) -> bool {
        (self as u8) >= 6
    }

    /// Returns the stage name, which is also the layer name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Validate => "validate",
            Self::Build => "build",
            Self::Auth => "auth",
            Self::Retry => "retry",
            Self::Sign => "sign",
            Self::Parse => "parse",
            Self::Send => "send",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 8] {
        [
            Self::Initialize,
            Self::Validate,
            Self::Build,
            Self::Auth,
            Self::Retry,
            Self::Sign,
            Self::Parse,
            Self::Send,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from composing a stack.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackError {
    /// No layer with the given name exists.
    #[error("no layer named '{0}' in the stack")]
    UnknownLayer(String),
}

/// An immutable, ordered middleware stack.
///
/// # Example
///
/// ```
/// use pylon_core::{OperationContext, Output};
/// use pylon_middleware::{FnMiddleware, MiddlewareStack};
///
/// # tokio_test::block_on(async {
/// let stack = MiddlewareStack::<u32, u32>::builder()
///     .layer(FnMiddleware::<u32, u32>::new("double", |input: &mut u32, ctx, next| {
///         Box::pin(async move {
///             *input *= 2;
///             next.run(input, ctx).await
///         })
///     }))
///     .layer(FnMiddleware::<u32, u32>::new("answer", |input: &mut u32, _ctx, _next| {
///         let value = *input;
///         Box::pin(async move { Output::from_data(value) })
///     }))
///     .build();
///
/// let mut ctx = OperationContext::new("Double");
/// let output = stack.call(&mut 21, &mut ctx).await;
/// assert_eq!(output.data, Some(42));
/// # });
/// ```
pub struct MiddlewareStack<I, O> {
    layers: Vec<BoxedMiddleware<I, O>>,
}

impl<I, O> MiddlewareStack<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a new stack builder.
    #[must_use]
    pub fn builder() -> StackBuilder<I, O> {
        StackBuilder::new()
    }

    /// Runs `input` through every layer.
    ///
    /// The first layer receives control; each layer decides whether to call
    /// the next one.
    pub async fn call(&self, input: &mut I, ctx: &mut OperationContext) -> Output<O> {
        Next::new(&self.layers).run(input, ctx).await
    }

    /// Returns the layer names in order.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the stack has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<I, O> fmt::Debug for MiddlewareStack<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareStack")
            .field(
                "layers",
                &self.layers.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for constructing a [`MiddlewareStack`].
pub struct StackBuilder<I, O> {
    layers: Vec<BoxedMiddleware<I, O>>,
}

impl<I, O> StackBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Appends a layer.
    #[must_use]
    pub fn layer<M: Middleware<I, O>>(mut self, middleware: M) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared layer.
    #[must_use]
    pub fn layer_arc(mut self, middleware: BoxedMiddleware<I, O>) -> Self {
        self.layers.push(middleware);
        self
    }

    /// Inserts a layer directly before the layer named `name`.
    pub fn insert_before<M: Middleware<I, O>>(
        mut self,
        name: &str,
        middleware: M,
    ) -> Result<Self, StackError> {
        let index = self.position(name)?;
        self.layers.insert(index, Arc::new(middleware));
        Ok(self)
    }

    /// Inserts a layer directly after the layer named `name`.
    pub fn insert_after<M: Middleware<I, O>>(
        mut self,
        name: &str,
        middleware: M,
    ) -> Result<Self, StackError> {
        let index = self.position(name)?;
        self.layers.insert(index + 1, Arc::new(middleware));
        Ok(self)
    }

    /// Removes the layer named `name`.
    pub fn remove(mut self, name: &str) -> Result<Self, StackError> {
        let index = self.position(name)?;
        self.layers.remove(index);
        Ok(self)
    }

    /// Returns true if a layer named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.layers.iter().any(|layer| layer.name() == name)
    }

    /// Returns the layer names in order.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Builds the stack.
    #[must_use]
    pub fn build(self) -> MiddlewareStack<I, O> {
        MiddlewareStack {
            layers: self.layers,
        }
    }

    fn position(&self, name: &str) -> Result<usize, StackError> {
        self.layers
            .iter()
            .position(|layer| layer.name() == name)
            .ok_or_else(|| StackError::UnknownLayer(name.to_string()))
    }
}

impl<I, O> Default for StackBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnMiddleware;
    use pylon_core::PipelineError;

    type Trail = Vec<&'static str>;

    fn mark(name: &'static str) -> FnMiddleware<Trail, usize> {
        FnMiddleware::new(name, move |input: &mut Trail, ctx, next| {
            Box::pin(async move {
                input.push(name);
                next.run(input, ctx).await
            })
        })
    }

    fn terminal() -> FnMiddleware<Trail, usize> {
        FnMiddleware::new("terminal", |input: &mut Trail, _ctx, _next| {
            let len = input.len();
            Box::pin(async move { Output::from_data(len) })
        })
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = Stage::all().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["initialize", "validate", "build", "auth", "retry", "sign", "parse", "send"]
        );
        assert!(!Stage::Retry.is_per_attempt());
        assert!(Stage::Sign.is_per_attempt());
        assert!(Stage::Send.is_per_attempt());
    }

    #[tokio::test]
    async fn test_stack_runs_layers_in_order() {
        let stack = MiddlewareStack::builder()
            .layer(mark("a"))
            .layer(mark("b"))
            .layer(terminal())
            .build();

        let mut trail = Vec::new();
        let mut ctx = OperationContext::new("Op");
        let output = stack.call(&mut trail, &mut ctx).await;

        assert_eq!(trail, vec!["a", "b"]);
        assert_eq!(output.data, Some(2));
        assert_eq!(stack.layer_names(), vec!["a", "b", "terminal"]);
    }

    #[test]
    fn test_debug_lists_layer_names() {
        let stack = MiddlewareStack::builder()
            .layer(mark("a"))
            .layer(terminal())
            .build();

        assert_eq!(
            format!("{stack:?}"),
            r#"MiddlewareStack { layers: ["a", "terminal"] }"#
        );
    }

    #[test]
    fn test_insert_before_and_after() {
        let builder = StackBuilder::new()
            .layer(mark("a"))
            .layer(terminal())
            .insert_before("terminal", mark("b"))
            .unwrap()
            .insert_after("a", mark("a2"))
            .unwrap();

        assert_eq!(builder.layer_names(), vec!["a", "a2", "b", "terminal"]);
    }

    #[test]
    fn test_remove() {
        let builder = StackBuilder::new()
            .layer(mark("a"))
            .layer(mark("b"))
            .layer(terminal())
            .remove("b")
            .unwrap();

        assert_eq!(builder.layer_names(), vec!["a", "terminal"]);
        assert!(!builder.contains("b"));
    }

    #[test]
    fn test_unknown_layer() {
        let err = StackBuilder::<Trail, usize>::new()
            .layer(terminal())
            .remove("missing")
            .err();
        assert_eq!(err, Some(StackError::UnknownLayer("missing".to_string())));

        let err = StackBuilder::<Trail, usize>::new()
            .insert_before("missing", mark("a"))
            .err();
        assert_eq!(
            err.map(|e| e.to_string()),
            Some("no layer named 'missing' in the stack".to_string())
        );
    }

    #[tokio::test]
    async fn test_stack_without_terminal_is_exhausted() {
        let stack = MiddlewareStack::builder().layer(mark("a")).build();

        let mut trail = Vec::new();
        let mut ctx = OperationContext::new("Op");
        let output = stack.call(&mut trail, &mut ctx).await;

        assert!(matches!(output.error, Some(PipelineError::StackExhausted)));
    }
}
