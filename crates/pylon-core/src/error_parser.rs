//! HTTP error detection and attempt classification.
//!
//! [`HttpErrorParser`] turns error responses into [`ApiError`]s using a
//! configurable error-code extractor and a table of modeled errors.
//! [`ErrorInspector`] looks at a failed attempt and decides which kind of
//! retryable failure it is, if any.

use crate::codec::ErrorParser;
use crate::context::OperationMetadata;
use crate::error::{ApiError, PipelineError, TransportErrorKind};
use crate::http::HttpResponse;
use chrono::{DateTime, Utc};
use http::header::RETRY_AFTER;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Error codes treated as throttling even when not modeled as such.
pub const THROTTLING_ERROR_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "RequestThrottled",
    "SlowDown",
    "PriorRequestNotComplete",
];

/// Error codes treated as transient.
pub const TRANSIENT_ERROR_CODES: &[&str] = &[
    "RequestTimeout",
    "RequestTimeoutException",
    "InternalError",
];

/// HTTP statuses treated as transient server errors.
pub const TRANSIENT_STATUS_CODES: &[u16] = &[500, 502, 503, 504];

/// Retry traits of a modeled error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeledError {
    /// The model marks the error retryable.
    pub retryable: bool,
    /// The model marks the error as throttling.
    pub throttling: bool,
}

type CodeExtractor = Arc<dyn Fn(&HttpResponse) -> Option<String> + Send + Sync>;

/// Detects error responses and maps them to [`ApiError`]s.
///
/// A response is an error if its status is outside `2xx` or the code
/// extractor finds an error code in it. Known codes take their retry traits
/// from the modeled error table; unknown ones fall back to `ClientError`
/// (`4xx`), `ServerError` (`5xx`) or `ApiError`.
///
/// # Example
///
/// ```
/// use pylon_core::codec::ErrorParser;
/// use pylon_core::error_parser::{HttpErrorParser, ModeledError};
/// use pylon_core::OperationMetadata;
///
/// let parser = HttpErrorParser::json().with_error(
///     "ThrottlingException",
///     ModeledError { retryable: true, throttling: true },
/// );
///
/// let response = http::Response::builder()
///     .status(400)
///     .body(bytes::Bytes::from_static(br#"{"code":"ThrottlingException"}"#))
///     .unwrap();
///
/// let error = parser.parse(&response, &OperationMetadata::new("GetWidget")).unwrap();
/// assert_eq!(error.code(), "ThrottlingException");
/// assert!(error.is_throttling());
/// ```
#[derive(Clone)]
pub struct HttpErrorParser {
    extract_code: CodeExtractor,
    errors: HashMap<String, ModeledError>,
    request_id_header: Option<http::HeaderName>,
}

impl HttpErrorParser {
    /// Creates a parser with a custom error-code extractor.
    pub fn new<F>(extract_code: F) -> Self
    where
        F: Fn(&HttpResponse) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            extract_code: Arc::new(extract_code),
            errors: HashMap::new(),
            request_id_header: Some(http::HeaderName::from_static("x-request-id")),
        }
    }

    /// Creates a parser that reads the error code from a JSON body.
    ///
    /// Looks at the `code` and `__type` members; a `__type` of the form
    /// `namespace#Code` yields `Code`.
    pub fn json() -> Self {
        Self::new(json_error_code)
    }

    /// Registers a modeled error code and its retry traits.
    #[must_use]
    pub fn with_error(mut self, code: impl Into<String>, traits: ModeledError) -> Self {
        self.errors.insert(code.into(), traits);
        self
    }

    /// Sets the header carrying the service request id.
    #[must_use]
    pub fn with_request_id_header(mut self, header: Option<http::HeaderName>) -> Self {
        self.request_id_header = header;
        self
    }

    fn generic_code(status: u16) -> &'static str {
        match status {
            400..=499 => "ClientError",
            500..=599 => "ServerError",
            _ => "ApiError",
        }
    }
}

impl ErrorParser for HttpErrorParser {
    fn parse(&self, response: &HttpResponse, metadata: &OperationMetadata) -> Option<ApiError> {
        let status = response.status();
        let code = (self.extract_code)(response);
        if status.is_success() && code.is_none() {
            return None;
        }

        let (code, traits) = match code {
            Some(code) => {
                let traits = self.errors.get(&code).copied().unwrap_or_default();
                (code, traits)
            }
            None => (
                Self::generic_code(status.as_u16()).to_string(),
                ModeledError::default(),
            ),
        };

        let message = response_message(response)
            .unwrap_or_else(|| format!("encountered a {} error", status.as_u16()));

        let mut error = ApiError::new(code, message)
            .with_status(status.as_u16())
            .with_retryable(traits.retryable)
            .with_throttling(traits.throttling);

        if let Some(request_id) = self
            .request_id_header
            .as_ref()
            .and_then(|name| response.headers().get(name))
            .and_then(|value| value.to_str().ok())
        {
            error = error.with_request_id(request_id);
        }

        tracing::debug!(
            operation = %metadata.operation_name,
            code = error.code(),
            status = status.as_u16(),
            "detected service error"
        );
        Some(error)
    }
}

impl fmt::Debug for HttpErrorParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpErrorParser")
            .field("errors", &self.errors)
            .field("request_id_header", &self.request_id_header)
            .finish_non_exhaustive()
    }
}

fn json_body(response: &HttpResponse) -> Option<serde_json::Value> {
    if response.body().is_empty() {
        return None;
    }
    serde_json::from_slice(response.body()).ok()
}

/// Extracts an error code from a JSON body's `code` or `__type` member.
pub fn json_error_code(response: &HttpResponse) -> Option<String> {
    let body = json_body(response)?;
    let raw = body
        .get("code")
        .or_else(|| body.get("__type"))
        .and_then(serde_json::Value::as_str)?;
    let code = raw.rsplit('#').next().unwrap_or(raw);
    let code = code.split(':').next().unwrap_or(code);
    (!code.is_empty()).then(|| code.to_string())
}

fn response_message(response: &HttpResponse) -> Option<String> {
    let body = json_body(response)?;
    body.get("message")
        .or_else(|| body.get("Message"))
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
}

/// The kind of retryable failure an attempt ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection-level failure or transient error code.
    Transient,
    /// The transport timed out.
    Timeout,
    /// The service asked the client to slow down.
    Throttling,
    /// A transient server status such as 503.
    ServerError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transient => "transient",
            Self::Timeout => "timeout",
            Self::Throttling => "throttling",
            Self::ServerError => "server_error",
        };
        f.write_str(name)
    }
}

/// Classifies the error of a finished attempt.
#[derive(Debug, Clone, Copy)]
pub struct ErrorInspector<'a> {
    error: &'a PipelineError,
    response: Option<&'a HttpResponse>,
}

impl<'a> ErrorInspector<'a> {
    /// Inspects `error`, with the attempt's transport response if one arrived.
    #[must_use]
    pub fn new(error: &'a PipelineError, response: Option<&'a HttpResponse>) -> Self {
        Self { error, response }
    }

    fn status(&self) -> Option<u16> {
        self.response
            .map(|r| r.status().as_u16())
            .or_else(|| self.error.as_service_error().and_then(ApiError::status))
    }

    fn code(&self) -> Option<&str> {
        self.error.as_service_error().map(ApiError::code)
    }

    /// Returns true for throttling service errors, including `429` responses.
    #[must_use]
    pub fn is_throttling(&self) -> bool {
        let Some(service) = self.error.as_service_error() else {
            return false;
        };
        service.is_throttling()
            || THROTTLING_ERROR_CODES.contains(&service.code())
            || self.status() == Some(429)
    }

    /// Returns true if the transport timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.error
            .as_transport_error()
            .is_some_and(|e| e.kind() == TransportErrorKind::Timeout)
    }

    /// Returns true for retryable connection-level failures and transient
    /// error codes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.error
            .as_transport_error()
            .is_some_and(|e| e.kind().is_retryable())
            || self.code().is_some_and(|c| TRANSIENT_ERROR_CODES.contains(&c))
    }

    /// Returns true for transient server statuses.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.error.as_service_error().is_some()
            && self
                .status()
                .is_some_and(|s| TRANSIENT_STATUS_CODES.contains(&s))
    }

    /// Returns true if the model marks the error retryable.
    #[must_use]
    pub fn is_modeled_retryable(&self) -> bool {
        self.error
            .as_service_error()
            .is_some_and(ApiError::is_retryable)
    }

    /// Returns the retryable kind of this error, or `None` if it is fatal.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        if self.is_throttling() {
            Some(ErrorKind::Throttling)
        } else if self.is_timeout() {
            Some(ErrorKind::Timeout)
        } else if self.is_transient() || self.is_modeled_retryable() {
            Some(ErrorKind::Transient)
        } else if self.is_server_error() {
            Some(ErrorKind::ServerError)
        } else {
            None
        }
    }

    /// Reads the `Retry-After` hint as delta-seconds or an HTTP date.
    #[must_use]
    pub fn retry_after_hint(&self) -> Option<Duration> {
        let value = self.response?.headers().get(RETRY_AFTER)?.to_str().ok()?;
        parse_retry_after(value.trim(), Utc::now())
    }
}

fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    (at - now).to_std().ok().or(Some(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InterceptorError, TransportError};
    use crate::interceptor::Hook;
    use bytes::Bytes;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        http::Response::builder()
            .status(status)
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    fn metadata() -> OperationMetadata {
        OperationMetadata::new("GetWidget")
    }

    #[test]
    fn test_success_is_not_an_error() {
        let parser = HttpErrorParser::json();
        assert!(parser.parse(&response(200, r#"{"name":"w"}"#), &metadata()).is_none());
    }

    #[test]
    fn test_error_code_on_success_status_is_an_error() {
        let parser = HttpErrorParser::json();
        let error = parser
            .parse(&response(200, r#"{"code":"InternalError"}"#), &metadata())
            .unwrap();
        assert_eq!(error.code(), "InternalError");
    }

    #[test]
    fn test_generic_fallbacks() {
        let parser = HttpErrorParser::json();
        let client = parser.parse(&response(404, ""), &metadata()).unwrap();
        let server = parser.parse(&response(503, ""), &metadata()).unwrap();
        let other = parser.parse(&response(302, ""), &metadata()).unwrap();

        assert_eq!(client.code(), "ClientError");
        assert_eq!(client.message(), "encountered a 404 error");
        assert_eq!(server.code(), "ServerError");
        assert_eq!(other.code(), "ApiError");
    }

    #[test]
    fn test_modeled_error_traits_and_message() {
        let parser = HttpErrorParser::json().with_error(
            "WidgetBusy",
            ModeledError {
                retryable: true,
                throttling: false,
            },
        );
        let error = parser
            .parse(
                &response(409, r#"{"__type":"com.example#WidgetBusy","message":"busy"}"#),
                &metadata(),
            )
            .unwrap();

        assert_eq!(error.code(), "WidgetBusy");
        assert_eq!(error.message(), "busy");
        assert!(error.is_retryable());
        assert_eq!(error.status(), Some(409));
    }

    #[test]
    fn test_request_id_header() {
        let parser = HttpErrorParser::json();
        let resp = http::Response::builder()
            .status(500)
            .header("x-request-id", "req-42")
            .body(Bytes::new())
            .unwrap();
        let error = parser.parse(&resp, &metadata()).unwrap();
        assert_eq!(error.request_id(), Some("req-42"));
    }

    #[test]
    fn test_inspector_kinds() {
        let throttled = PipelineError::Service(ApiError::new("SlowDown", "").with_status(503));
        assert_eq!(
            ErrorInspector::new(&throttled, None).error_kind(),
            Some(ErrorKind::Throttling)
        );

        let timeout = PipelineError::Transport(TransportError::timeout("read timed out"));
        assert_eq!(
            ErrorInspector::new(&timeout, None).error_kind(),
            Some(ErrorKind::Timeout)
        );

        let refused = PipelineError::Transport(TransportError::connect("refused"));
        assert_eq!(
            ErrorInspector::new(&refused, None).error_kind(),
            Some(ErrorKind::Transient)
        );

        let unavailable = PipelineError::Service(ApiError::new("ServerError", "").with_status(503));
        assert_eq!(
            ErrorInspector::new(&unavailable, None).error_kind(),
            Some(ErrorKind::ServerError)
        );

        let not_found = PipelineError::Service(ApiError::new("ClientError", "").with_status(404));
        assert_eq!(ErrorInspector::new(&not_found, None).error_kind(), None);

        assert_eq!(
            ErrorInspector::new(&PipelineError::Cancelled, None).error_kind(),
            None
        );

        let malformed = PipelineError::Transport(TransportError::malformed("builder error"));
        assert_eq!(ErrorInspector::new(&malformed, None).error_kind(), None);
    }

    #[test]
    fn test_429_only_throttles_service_errors() {
        let resp = http::Response::builder()
            .status(429)
            .body(Bytes::new())
            .unwrap();

        let service = PipelineError::Service(ApiError::new("ClientError", "").with_status(429));
        assert!(ErrorInspector::new(&service, Some(&resp)).is_throttling());

        let hook = PipelineError::Interceptor(InterceptorError {
            hook: Hook::ReadAfterTransmit,
            interceptor: "guard".to_string(),
            source: "rejected".into(),
        });
        let inspector = ErrorInspector::new(&hook, Some(&resp));
        assert!(!inspector.is_throttling());
        assert_eq!(inspector.error_kind(), None);
    }

    #[test]
    fn test_retry_after_hint() {
        let resp = http::Response::builder()
            .status(429)
            .header(RETRY_AFTER, "3")
            .body(Bytes::new())
            .unwrap();
        let error = PipelineError::Service(ApiError::new("TooManyRequestsException", ""));
        let inspector = ErrorInspector::new(&error, Some(&resp));

        assert!(inspector.is_throttling());
        assert_eq!(inspector.retry_after_hint(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_retry_after_http_date() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:10 GMT", now),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:27:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }
}
