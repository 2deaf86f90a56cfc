//! Scripted HTTP client.

use crate::request::RecordedRequest;
use bytes::Bytes;
use parking_lot::Mutex;
use pylon_core::{BoxFuture, HttpClient, HttpRequest, HttpResponse, TransportError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

enum Scripted {
    Response(HttpResponse),
    Error(TransportError),
}

#[derive(Default)]
struct State {
    script: VecDeque<Scripted>,
    requests: Vec<RecordedRequest>,
}

/// An [`HttpClient`] that answers from a script.
///
/// Queued outcomes are returned in order; once the script is empty every
/// send gets an empty `200` response. Every request is recorded before the
/// optional latency elapses. Clones share the script and the recording.
///
/// # Example
///
/// ```
/// use pylon_core::TransportError;
/// use pylon_test::{fixtures, MockHttpClient};
///
/// let client = MockHttpClient::new();
/// client.push_error(TransportError::connect("connection reset"));
/// client.push_response(fixtures::empty_response(204));
/// assert_eq!(client.pending(), 2);
/// ```
#[derive(Clone, Default)]
pub struct MockHttpClient {
    state: Arc<Mutex<State>>,
    latency: Option<Duration>,
}

impl MockHttpClient {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queues a response.
    pub fn push_response(&self, response: HttpResponse) {
        self.state.lock().script.push_back(Scripted::Response(response));
    }

    /// Queues a JSON response.
    pub fn push_json(&self, status: u16, body: &serde_json::Value) {
        self.push_response(crate::fixtures::json_response(status, body));
    }

    /// Queues a transport error.
    pub fn push_error(&self, error: TransportError) {
        self.state.lock().script.push_back(Scripted::Error(error));
    }

    /// Returns the number of outcomes still queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().script.len()
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Returns the last request received.
    #[must_use]
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// Returns the number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }
}

impl HttpClient for MockHttpClient {
    fn send<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        let next = {
            let mut state = self.state.lock();
            state.requests.push(RecordedRequest::capture(request));
            state.script.pop_front()
        };

        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            match next {
                Some(Scripted::Response(response)) => Ok(response),
                Some(Scripted::Error(error)) => Err(error),
                None => Ok(http::Response::new(Bytes::new())),
            }
        })
    }
}

impl std::fmt::Debug for MockHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockHttpClient")
            .field("pending", &state.script.len())
            .field("requests", &state.requests.len())
            .field("latency", &self.latency)
            .finish()
    }
}
