//! Requests captured by the mock transport.

use crate::error::TestError;
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use pylon_core::HttpRequest;
use serde::de::DeserializeOwned;

/// A copy of a request as it reached the transport.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl RecordedRequest {
    /// Copies `request`.
    #[must_use]
    pub fn capture(request: &HttpRequest) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
            body: request.body().clone(),
        }
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| TestError::InvalidUtf8(e.to_string()))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Returns the decoded query parameters in order.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, TestError> {
        let query = self.uri.query().unwrap_or("");
        serde_urlencoded::from_str(query).map_err(|e| TestError::InvalidQuery(e.to_string()))
    }

    /// Returns the decoded value of query parameter `name`, if present.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_pairs()
            .ok()?
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }
}
