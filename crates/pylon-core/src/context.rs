//! Per-call operation context.
//!
//! The [`OperationContext`] is created when a call starts, threaded mutably
//! through every middleware layer and dropped when the call returns. It is
//! never shared between calls.

use crate::auth::ResolvedAuth;
use crate::cancel::CancelSignal;
use crate::error::PipelineError;
use crate::http::{HttpRequest, HttpResponse};
use crate::interceptor::{Hook, InterceptorContext, InterceptorList, OutputView};
use crate::output::Output;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Unique identifier for a single call.
///
/// Uses UUID v7, so ids are time-ordered.
///
/// # Example
///
/// ```
/// use pylon_core::InvocationId;
///
/// let id = InvocationId::new();
/// println!("invocation: {id}");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Creates a new time-ordered invocation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static facts about the operation being called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMetadata {
    /// Modeled operation name, e.g. `GetWidget`.
    pub operation_name: String,
    /// Id of this particular call.
    pub invocation_id: InvocationId,
}

impl OperationMetadata {
    /// Creates metadata for `operation_name` with a fresh invocation id.
    #[must_use]
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            invocation_id: InvocationId::new(),
        }
    }
}

/// Lifecycle of the retry loop for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetryPhase {
    /// No attempt has been made yet.
    #[default]
    NotYetSent,
    /// An attempt is in flight or being classified.
    Attempting,
    /// The last attempt was not retried and succeeded.
    Succeeded,
    /// A retryable failure occurred but attempts or quota ran out.
    Exhausted,
    /// The last attempt failed with a non-retryable error.
    FatalError,
}

impl RetryPhase {
    /// Returns true once the retry loop has finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted | Self::FatalError)
    }
}

/// Retry bookkeeping for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts started so far, including the first.
    pub attempts: u32,
    /// Total time spent waiting between attempts.
    pub total_delay: Duration,
    /// Tokens left in this call's retry quota.
    pub quota_balance: u32,
    /// Where the retry loop currently is.
    pub phase: RetryPhase,
}

/// Mutable carrier for everything one call needs.
///
/// # Example
///
/// ```
/// use pylon_core::{OperationContext, RetryPhase};
///
/// let ctx = OperationContext::new("GetWidget");
/// assert_eq!(ctx.operation_name(), "GetWidget");
/// assert_eq!(ctx.retry().phase, RetryPhase::NotYetSent);
/// assert!(ctx.response().is_none());
/// ```
#[derive(Debug)]
pub struct OperationContext {
    metadata: OperationMetadata,
    request: HttpRequest,
    response: Option<HttpResponse>,
    auth: Option<ResolvedAuth>,
    retry: RetryState,
    interceptors: InterceptorList,
    cancel: CancelSignal,
    timeout: Option<Duration>,
    span: tracing::Span,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl OperationContext {
    /// Creates a context with an empty request and no interceptors.
    #[must_use]
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self::with_request(operation_name, http::Request::new(Bytes::new()))
    }

    /// Creates a context around a pre-populated request, e.g. one whose URI
    /// already points at the client's endpoint.
    #[must_use]
    pub fn with_request(operation_name: impl Into<String>, request: HttpRequest) -> Self {
        Self {
            metadata: OperationMetadata::new(operation_name),
            request,
            response: None,
            auth: None,
            retry: RetryState::default(),
            interceptors: InterceptorList::new(),
            cancel: CancelSignal::new(),
            timeout: None,
            span: tracing::Span::none(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Sets the interceptors run for this call.
    #[must_use]
    pub fn with_interceptors(mut self, interceptors: InterceptorList) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Sets the cancellation signal observed by this call.
    #[must_use]
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the timeout applied to each transport send.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the logging span the middleware logs under.
    #[must_use]
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the operation metadata.
    #[must_use]
    pub fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.metadata.operation_name
    }

    /// Returns the invocation id.
    #[must_use]
    pub fn invocation_id(&self) -> InvocationId {
        self.metadata.invocation_id
    }

    /// Returns the in-flight transport request.
    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Returns the in-flight transport request mutably.
    pub fn request_mut(&mut self) -> &mut HttpRequest {
        &mut self.request
    }

    /// Returns the transport response of the current attempt, if any.
    #[must_use]
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    /// Stores the transport response of the current attempt.
    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    /// Discards the transport response, e.g. before a retry.
    pub fn clear_response(&mut self) -> Option<HttpResponse> {
        self.response.take()
    }

    /// Returns the resolved auth decision, if the Auth layer has run.
    #[must_use]
    pub fn auth(&self) -> Option<&ResolvedAuth> {
        self.auth.as_ref()
    }

    /// Attaches the resolved auth decision.
    pub fn set_auth(&mut self, auth: ResolvedAuth) {
        self.auth = Some(auth);
    }

    /// Returns the retry state.
    #[must_use]
    pub fn retry(&self) -> &RetryState {
        &self.retry
    }

    /// Returns the retry state mutably.
    pub fn retry_mut(&mut self) -> &mut RetryState {
        &mut self.retry
    }

    /// Returns the interceptors for this call.
    #[must_use]
    pub fn interceptors(&self) -> &InterceptorList {
        &self.interceptors
    }

    /// Returns the cancellation signal.
    #[must_use]
    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Returns true if the caller cancelled this call.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the per-send timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the logging span for this call.
    #[must_use]
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Returns when the call started.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time elapsed since the call started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Runs every interceptor for `hook`, stopping at the first failure.
    ///
    /// `output` is `None` for hooks that run before any output exists.
    pub fn invoke_interceptors<I, O>(
        &mut self,
        hook: Hook,
        input: &mut I,
        output: Option<&mut Output<O>>,
    ) -> Result<(), PipelineError>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        if self.interceptors.is_empty() {
            return Ok(());
        }

        let Self {
            metadata,
            request,
            response,
            retry,
            interceptors,
            ..
        } = self;

        let output = output.map(|output| OutputView::new(&mut output.data, &mut output.error));
        let mut hook_ctx = InterceptorContext::new(
            &metadata.operation_name,
            retry.attempts,
            input,
            request,
            response.as_mut(),
            output,
        );
        interceptors.invoke(hook, &mut hook_ctx, false)
    }

    /// Stores a typed extension value.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_core::OperationContext;
    ///
    /// struct Region(&'static str);
    ///
    /// let mut ctx = OperationContext::new("GetWidget");
    /// ctx.set_extension(Region("eu-west-1"));
    /// assert_eq!(ctx.get_extension::<Region>().map(|r| r.0), Some("eu-west-1"));
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }
}
