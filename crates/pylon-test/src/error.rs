//! Test error types.

use std::fmt;

/// Errors that can occur while inspecting test traffic.
#[derive(Debug)]
pub enum TestError {
    /// Body is not valid UTF-8
    InvalidUtf8(String),
    /// JSON deserialization failed
    Json(serde_json::Error),
    /// Query string could not be decoded
    InvalidQuery(String),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8(msg) => write!(f, "Invalid UTF-8 body: {msg}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::InvalidQuery(msg) => write!(f, "Invalid query string: {msg}"),
        }
    }
}

impl std::error::Error for TestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::InvalidUtf8(_) | Self::InvalidQuery(_) => None,
        }
    }
}

impl From<serde_json::Error> for TestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
