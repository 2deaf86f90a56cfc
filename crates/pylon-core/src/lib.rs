//! # Pylon Core
//!
//! Core types and collaborator traits for the Pylon client execution pipeline.
//!
//! This crate provides the foundational types every pipeline layer works with:
//!
//! - [`OperationContext`] - Per-call carrier for the transport request/response,
//!   resolved auth, retry state and interceptors
//! - [`Output`] - Typed result of a pipeline traversal (data or error)
//! - [`PipelineError`] - The error taxonomy surfaced through `Output::error`
//! - [`Interceptor`] / [`Hook`] - The interceptor hook protocol
//! - [`auth`] / [`identity`] - Auth options, schemes, signers and identity resolvers
//! - [`codec`] - Builder, validator and parser contracts implemented by generated code
//! - [`HttpClient`] - The transport capability consumed by the Send layer

#![doc(html_root_url = "https://docs.rs/pylon-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
mod cancel;
pub mod codec;
mod context;
mod error;
pub mod error_parser;
mod http;
pub mod identity;
mod interceptor;
mod output;
pub mod types;
pub mod validation;

pub use cancel::CancelSignal;
pub use context::{InvocationId, OperationContext, OperationMetadata, RetryPhase, RetryState};
pub use error::{
    ApiError, AuthFailure, AuthFailureReason, BoxError, BuildError, IdentityError,
    InterceptorError, ParseError, PipelineError, SigningError, TransportError,
    TransportErrorKind, ValidationError,
};
pub use http::{BoxFuture, HttpClient, HttpRequest, HttpResponse};
pub use interceptor::{
    Hook, HookResult, Interceptor, InterceptorContext, InterceptorList, OutputView,
};
pub use output::Output;
