//! Error types for the Pylon pipeline.
//!
//! [`PipelineError`] is the single error type carried in [`Output::error`].
//! Its variants follow the failure taxonomy of the pipeline:
//!
//! | Variant | Origin | Retried |
//! |---|---|---|
//! | `Auth` | Auth layer, no viable auth option | never |
//! | `Validation` | Validate layer | never |
//! | `Build` / `Signing` / `Parse` | external builder, signer, data parser | never |
//! | `Transport` | HTTP client | per retry policy |
//! | `Service` | error parser (modeled service error) | per retry policy |
//! | `Interceptor` / `Interceptors` | interceptor hooks | never |
//! | `Cancelled` / `TimedOut` | Send boundary or back-off wait | never |
//!
//! [`Output::error`]: crate::Output

use crate::identity::IdentityType;
use crate::interceptor::Hook;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A boxed, thread-safe error used as the source of collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of a connection-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The connection could not be established.
    Connect,
    /// The HTTP client's own read/connect timeout elapsed.
    Timeout,
    /// An I/O error occurred mid-exchange.
    Io,
    /// The request could not be dispatched.
    Request,
    /// The request itself is invalid, e.g. a relative URI or a bad header.
    Malformed,
    /// Any other transport failure.
    Other,
}

impl TransportErrorKind {
    /// Returns false for failures that repeat on every attempt.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::Malformed)
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Io => "io",
            Self::Request => "request",
            Self::Malformed => "malformed request",
            Self::Other => "transport",
        };
        f.write_str(name)
    }
}

/// A connection-level failure reported by an [`HttpClient`](crate::HttpClient).
#[derive(Error, Debug)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    /// Creates a transport error of the given kind.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error wrapping an underlying error.
    #[must_use]
    pub fn with_source(
        kind: TransportErrorKind,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a connection failure.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    /// Creates a client-side timeout failure.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Creates a failure for a request the client cannot send as built.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Malformed, message)
    }

    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Input did not conform to the modeled shape.
///
/// `context` is the path of the offending member, e.g. `input[:tags][2]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed for {context}: {message}")]
pub struct ValidationError {
    /// Path-qualified location of the offending value.
    pub context: String,
    /// What was wrong with the value.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error for `context`.
    #[must_use]
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// A modeled service error detected by an [`ErrorParser`](crate::codec::ErrorParser).
///
/// Service errors are returned in `Output::error`, never raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ApiError {
    code: String,
    message: String,
    status: Option<u16>,
    request_id: Option<String>,
    retryable: bool,
    throttling: bool,
}

impl ApiError {
    /// Creates a service error with an error code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: None,
            request_id: None,
            retryable: false,
            throttling: false,
        }
    }

    /// Sets the HTTP status the error was parsed from.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the service request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Marks the error as modeled-retryable.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Marks the error as a throttling error.
    #[must_use]
    pub fn with_throttling(mut self, throttling: bool) -> Self {
        self.throttling = throttling;
        self
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if known.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the service request id, if known.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns true if the model marks this error retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Returns true if the model marks this error as throttling.
    #[must_use]
    pub fn is_throttling(&self) -> bool {
        self.throttling
    }
}

/// The external builder failed to serialize typed input.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct BuildError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl BuildError {
    /// Creates a build error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a build error wrapping the serializer failure.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("failed to serialize input", err)
    }
}

/// The external data parser could not decode a response.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ParseError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ParseError {
    /// Creates a parse error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a parse error wrapping the decoder failure.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("failed to decode response body", err)
    }
}

/// A signer could not apply an identity to the request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SigningError {
    message: String,
}

impl SigningError {
    /// Creates a signing error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An identity resolver could not produce an identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct IdentityError {
    message: String,
}

impl IdentityError {
    /// Creates an identity resolution error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a single auth option was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailureReason {
    /// The option's scheme id is not in the client's scheme registry.
    SchemeNotEnabled,
    /// The scheme is registered but no resolver exists for its identity type.
    NoIdentityResolver {
        /// The identity type the scheme asked for.
        identity_type: IdentityType,
    },
    /// The resolver was found but failed.
    IdentityResolution(String),
}

impl fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemeNotEnabled => f.write_str("auth scheme not enabled"),
            Self::NoIdentityResolver { identity_type } => write!(
                f,
                "no identity resolver configured for identity type {identity_type}"
            ),
            Self::IdentityResolution(message) => {
                write!(f, "identity resolution failed: {message}")
            }
        }
    }
}

/// One rejected auth option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    /// The scheme id of the rejected option.
    pub scheme_id: String,
    /// Why the option was rejected.
    pub reason: AuthFailureReason,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scheme_id, self.reason)
    }
}

/// An interceptor hook failed.
#[derive(Error, Debug)]
#[error("interceptor '{interceptor}' failed at {hook}: {source}")]
pub struct InterceptorError {
    /// The hook that was running.
    pub hook: Hook,
    /// Name of the failing interceptor.
    pub interceptor: String,
    /// The failure returned by the interceptor.
    #[source]
    pub source: BoxError,
}

/// The error carried in `Output::error`.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No auth option could be resolved.
    #[error("{}", describe_auth_failures(.operation, .failures))]
    Auth {
        /// The operation being called.
        operation: String,
        /// Every attempted option and its rejection reason, in order.
        failures: Vec<AuthFailure>,
    },

    /// Input validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The builder failed.
    #[error("failed to build request: {0}")]
    Build(#[from] BuildError),

    /// The signer failed.
    #[error("failed to sign request: {0}")]
    Signing(#[from] SigningError),

    /// The transport failed.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The service returned a modeled error.
    #[error("service error: {0}")]
    Service(#[from] ApiError),

    /// The data parser failed.
    #[error("failed to parse response: {0}")]
    Parse(#[from] ParseError),

    /// A single interceptor failed (fail-fast mode).
    #[error(transparent)]
    Interceptor(#[from] InterceptorError),

    /// Several interceptors failed (aggregating mode).
    #[error("{} interceptors failed: {}", .0.len(), join_interceptor_errors(.0))]
    Interceptors(Vec<InterceptorError>),

    /// The call was cancelled by its caller.
    #[error("operation cancelled")]
    Cancelled,

    /// The per-call timeout elapsed.
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    /// Sign ran without a resolved auth decision on the context.
    #[error("no resolved auth on the operation context")]
    MissingAuth,

    /// Parse ran without a transport response or transport error.
    #[error("no transport response available to parse")]
    MissingResponse,

    /// The stack ran out of layers before a terminal layer answered.
    #[error("middleware stack ended without a terminal layer")]
    StackExhausted,
}

impl PipelineError {
    /// Creates a builder failure.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(BuildError::new(message))
    }

    /// Creates a signer failure.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing(SigningError::new(message))
    }

    /// Creates a data parser failure.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(ParseError::new(message))
    }

    /// Creates a validation failure at `context`.
    pub fn validation(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(context, message))
    }

    /// Returns true for cancellation and per-call timeouts.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut(_))
    }

    /// Returns the modeled service error, if this is one.
    #[must_use]
    pub fn as_service_error(&self) -> Option<&ApiError> {
        match self {
            Self::Service(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the transport error, if this is one.
    #[must_use]
    pub fn as_transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

fn describe_auth_failures(operation: &str, failures: &[AuthFailure]) -> String {
    if failures.is_empty() {
        return format!("no auth options available for operation '{operation}'");
    }
    let reasons: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!(
        "failed to resolve auth for operation '{operation}': {}",
        reasons.join("; ")
    )
}

fn join_interceptor_errors(errors: &[InterceptorError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_lists_every_failure() {
        let err = PipelineError::Auth {
            operation: "GetWidget".to_string(),
            failures: vec![
                AuthFailure {
                    scheme_id: "a".to_string(),
                    reason: AuthFailureReason::SchemeNotEnabled,
                },
                AuthFailure {
                    scheme_id: "b".to_string(),
                    reason: AuthFailureReason::NoIdentityResolver {
                        identity_type: IdentityType::Token,
                    },
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("GetWidget"));
        assert!(message.contains("a: auth scheme not enabled"));
        assert!(message.contains("b: no identity resolver configured for identity type token"));
    }

    #[test]
    fn test_auth_error_without_options() {
        let err = PipelineError::Auth {
            operation: "GetWidget".to_string(),
            failures: vec![],
        };
        assert_eq!(
            err.to_string(),
            "no auth options available for operation 'GetWidget'"
        );
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::connect("connection refused");
        assert_eq!(err.kind(), TransportErrorKind::Connect);
        assert_eq!(err.to_string(), "connect error: connection refused");
        assert!(err.kind().is_retryable());

        let err = TransportError::malformed("relative URL without a base");
        assert!(!err.kind().is_retryable());
        assert_eq!(
            err.to_string(),
            "malformed request error: relative URL without a base"
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("input[:name]", "expected value to be set");
        assert_eq!(
            err.to_string(),
            "validation failed for input[:name]: expected value to be set"
        );
    }

    #[test]
    fn test_api_error_accessors() {
        let err = ApiError::new("ThrottlingException", "slow down")
            .with_status(429)
            .with_request_id("req-1")
            .with_throttling(true);

        assert_eq!(err.code(), "ThrottlingException");
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.request_id(), Some("req-1"));
        assert!(err.is_throttling());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "ThrottlingException: slow down");
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(PipelineError::Cancelled.is_cancellation());
        assert!(PipelineError::TimedOut(Duration::from_secs(1)).is_cancellation());
        assert!(!PipelineError::MissingAuth.is_cancellation());
    }

    #[test]
    fn test_aggregated_interceptor_errors() {
        let err = PipelineError::Interceptors(vec![
            InterceptorError {
                hook: Hook::ReadBeforeExecution,
                interceptor: "first".to_string(),
                source: "boom".into(),
            },
            InterceptorError {
                hook: Hook::ReadBeforeExecution,
                interceptor: "second".to_string(),
                source: "bang".into(),
            },
        ]);

        let message = err.to_string();
        assert!(message.starts_with("2 interceptors failed"));
        assert!(message.contains("'first'"));
        assert!(message.contains("'second'"));
    }
}
