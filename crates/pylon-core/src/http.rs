//! Transport message types and the HTTP client capability.
//!
//! The pipeline works with plain `http` messages carrying a [`Bytes`] body so
//! that a request can be re-signed and re-sent on every retry attempt without
//! rebuilding it from typed input.

use crate::error::TransportError;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

/// A boxed future that is `Send` and borrows for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The transport request type built, signed and sent by the pipeline.
pub type HttpRequest = http::Request<Bytes>;

/// The transport response type parsed by the pipeline.
pub type HttpResponse = http::Response<Bytes>;

/// Sends transport requests.
///
/// Implementations own connection handling, TLS and socket timeouts. A
/// connection-level failure is reported as a [`TransportError`]; HTTP error
/// statuses are *not* failures at this level and are returned as responses.
///
/// # Example
///
/// ```
/// use pylon_core::{BoxFuture, HttpClient, HttpRequest, HttpResponse, TransportError};
/// use bytes::Bytes;
///
/// struct AlwaysOk;
///
/// impl HttpClient for AlwaysOk {
///     fn send<'a>(
///         &'a self,
///         _request: &'a HttpRequest,
///     ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
///         Box::pin(async { Ok(http::Response::new(Bytes::new())) })
///     }
/// }
/// ```
pub trait HttpClient: Send + Sync + 'static {
    /// Dispatches `request` and returns the transport response.
    fn send<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>>;
}
