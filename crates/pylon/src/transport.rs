//! The default `reqwest`-backed transport.

use bytes::Bytes;
use pylon_core::{BoxFuture, HttpClient, HttpRequest, HttpResponse, TransportError, TransportErrorKind};
use std::time::Duration;

/// [`HttpClient`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Creates a client with the given connect timeout.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the TLS backend cannot be initialised.
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest::Client`.
    #[must_use]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let request = reqwest::Request::try_from(request.clone()).map_err(|e| map_error(&e, e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| map_error(&e, e.to_string()))?;

        let mut builder = http::Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let body: Bytes = response
            .bytes()
            .await
            .map_err(|e| map_error(&e, format!("failed to read response body: {e}")))?;

        builder
            .body(body)
            .map_err(|e| TransportError::with_source(TransportErrorKind::Other, "invalid response", e))
    }
}

fn map_error(error: &reqwest::Error, message: String) -> TransportError {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_builder() {
        TransportErrorKind::Malformed
    } else if error.is_request() {
        TransportErrorKind::Request
    } else if error.is_body() || error.is_decode() {
        TransportErrorKind::Io
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, message)
}

impl HttpClient for ReqwestHttpClient {
    fn send<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        Box::pin(self.execute(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_relative_uri_is_malformed() {
        let client = ReqwestHttpClient::new(Duration::from_secs(1)).unwrap();
        let request = http::Request::builder()
            .uri("/widgets")
            .body(Bytes::new())
            .unwrap();

        let err = client.send(&request).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Malformed);
        assert!(!err.kind().is_retryable());
    }
}
