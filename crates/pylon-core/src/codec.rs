//! Contracts for the per-operation units supplied by generated code.
//!
//! A generated client provides, for every operation, a [`RequestBuilder`], an
//! optional [`Validator`], an [`ErrorParser`] and a [`DataParser`]. Closures
//! with the matching signature implement each trait, and [`JsonBody`] /
//! [`JsonDataParser`] cover plain JSON payloads.

use crate::context::OperationMetadata;
use crate::error::{ApiError, BuildError, ParseError, ValidationError};
use crate::http::{HttpRequest, HttpResponse};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Serializes typed input into the transport request.
pub trait RequestBuilder<I>: Send + Sync + 'static {
    /// Populates `request` from `input`.
    fn build(&self, request: &mut HttpRequest, input: &I) -> Result<(), BuildError>;
}

impl<I, F> RequestBuilder<I> for F
where
    F: Fn(&mut HttpRequest, &I) -> Result<(), BuildError> + Send + Sync + 'static,
{
    fn build(&self, request: &mut HttpRequest, input: &I) -> Result<(), BuildError> {
        self(request, input)
    }
}

/// Checks typed input against its modeled constraints.
///
/// `context` is the path of the value being validated; the root call passes
/// `"input"` and nested members extend it, e.g. `input[:tags][0]`.
pub trait Validator<I>: Send + Sync + 'static {
    /// Validates `input`.
    fn validate(&self, input: &I, context: &str) -> Result<(), ValidationError>;
}

impl<I, F> Validator<I> for F
where
    F: Fn(&I, &str) -> Result<(), ValidationError> + Send + Sync + 'static,
{
    fn validate(&self, input: &I, context: &str) -> Result<(), ValidationError> {
        self(input, context)
    }
}

/// Detects modeled service errors in a transport response.
pub trait ErrorParser: Send + Sync + 'static {
    /// Returns the error carried by `response`, or `None` for a success.
    fn parse(&self, response: &HttpResponse, metadata: &OperationMetadata) -> Option<ApiError>;
}

impl<F> ErrorParser for F
where
    F: Fn(&HttpResponse, &OperationMetadata) -> Option<ApiError> + Send + Sync + 'static,
{
    fn parse(&self, response: &HttpResponse, metadata: &OperationMetadata) -> Option<ApiError> {
        self(response, metadata)
    }
}

/// Decodes typed output from a successful transport response.
pub trait DataParser<O>: Send + Sync + 'static {
    /// Decodes `response`.
    fn parse(&self, response: &HttpResponse) -> Result<O, ParseError>;
}

impl<O, F> DataParser<O> for F
where
    F: Fn(&HttpResponse) -> Result<O, ParseError> + Send + Sync + 'static,
{
    fn parse(&self, response: &HttpResponse) -> Result<O, ParseError> {
        self(response)
    }
}

/// Writes the input as a JSON body with `content-type: application/json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody;

impl<I: Serialize> RequestBuilder<I> for JsonBody {
    fn build(&self, request: &mut HttpRequest, input: &I) -> Result<(), BuildError> {
        let body = serde_json::to_vec(input)?;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Bytes::from(body);
        Ok(())
    }
}

/// Decodes the response body as JSON.
///
/// An empty body decodes as JSON `null`, so outputs like `()` or
/// `Option<T>` accept empty responses.
pub struct JsonDataParser<O> {
    _output: PhantomData<fn() -> O>,
}

impl<O> JsonDataParser<O> {
    /// Creates a JSON parser for `O`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _output: PhantomData,
        }
    }
}

impl<O> Default for JsonDataParser<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> fmt::Debug for JsonDataParser<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonDataParser")
    }
}

impl<O: DeserializeOwned + 'static> DataParser<O> for JsonDataParser<O> {
    fn parse(&self, response: &HttpResponse) -> Result<O, ParseError> {
        let body = response.body();
        if body.is_empty() {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(body)?)
    }
}
