//! The standard pipeline layers.
//!
//! Each layer's name is its [`Stage`](crate::Stage) name, so stacks can be
//! rearranged with [`StackBuilder`](crate::StackBuilder) by stage.
//!
//! ## Outer stages (once per call)
//!
//! 1. [`initialize`] - Execution hooks and operation telemetry
//! 2. [`validate`] - Optional input validation
//! 3. [`build`] - Request building with serialization hooks
//! 4. [`auth`] - Auth option resolution
//! 5. [`retry`] - Attempt loop
//!
//! ## Attempt stages (once per attempt)
//!
//! 6. [`sign`] - Signing
//! 7. [`parse`] - Error and data parsing with deserialization hooks
//! 8. [`send`] - Transport dispatch

pub mod auth;
pub mod build;
pub mod initialize;
pub mod parse;
pub mod retry;
pub mod send;
pub mod sign;
pub mod validate;

pub use auth::AuthMiddleware;
pub use build::BuildMiddleware;
pub use initialize::InitializeMiddleware;
pub use parse::ParseMiddleware;
pub use retry::RetryMiddleware;
pub use send::SendMiddleware;
pub use sign::SignMiddleware;
pub use validate::ValidateMiddleware;

use pylon_core::{Hook, OperationContext, PipelineError};

/// Runs a hook that has no output to look at yet.
pub(crate) fn invoke_hook<I: Send + 'static>(
    ctx: &mut OperationContext,
    hook: Hook,
    input: &mut I,
) -> Result<(), PipelineError> {
    ctx.invoke_interceptors::<I, ()>(hook, input, None)
}
