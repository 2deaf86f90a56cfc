//! Canned transport outcomes for stubbed clients.
//!
//! With stubbing enabled the Send layer never touches the HTTP client. It
//! takes the next outcome queued for the operation instead; the last queued
//! outcome repeats for every further send, and an operation with nothing
//! queued gets an empty `200` response.

use bytes::Bytes;
use parking_lot::Mutex;
use pylon_core::{HttpResponse, TransportError};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

enum Stub {
    Response(HttpResponse),
    Error(TransportError),
}

impl Stub {
    fn duplicate(&self) -> Self {
        match self {
            Self::Response(response) => Self::Response(copy_response(response)),
            Self::Error(err) => Self::Error(TransportError::new(err.kind(), err.message())),
        }
    }

    fn into_result(self) -> Result<HttpResponse, TransportError> {
        match self {
            Self::Response(response) => Ok(response),
            Self::Error(err) => Err(err),
        }
    }
}

fn copy_response(response: &HttpResponse) -> HttpResponse {
    let mut copy = http::Response::new(response.body().clone());
    *copy.status_mut() = response.status();
    *copy.version_mut() = response.version();
    *copy.headers_mut() = response.headers().clone();
    copy
}

/// Shared queue of stubbed outcomes keyed by operation name.
///
/// Clones share the same queues.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use pylon_middleware::Stubs;
///
/// let stubs = Stubs::new();
/// stubs.add_response(
///     "GetWidget",
///     http::Response::builder().status(404).body(Bytes::new()).unwrap(),
/// );
///
/// let first = stubs.next("GetWidget").unwrap();
/// assert_eq!(first.status(), 404);
/// let again = stubs.next("GetWidget").unwrap();
/// assert_eq!(again.status(), 404);
/// assert_eq!(stubs.next("Other").unwrap().status(), 200);
/// ```
#[derive(Clone, Default)]
pub struct Stubs {
    queues: Arc<Mutex<HashMap<String, VecDeque<Stub>>>>,
}

impl Stubs {
    /// Creates an empty stub set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `operation`.
    pub fn add_response(&self, operation: impl Into<String>, response: HttpResponse) {
        self.push(operation.into(), Stub::Response(response));
    }

    /// Queues a transport error for `operation`.
    pub fn add_error(&self, operation: impl Into<String>, error: TransportError) {
        self.push(operation.into(), Stub::Error(error));
    }

    /// Returns the number of outcomes queued for `operation`.
    #[must_use]
    pub fn pending(&self, operation: &str) -> usize {
        self.queues.lock().get(operation).map_or(0, VecDeque::len)
    }

    /// Takes the next outcome for `operation`.
    pub fn next(&self, operation: &str) -> Result<HttpResponse, TransportError> {
        let mut queues = self.queues.lock();
        let stub = match queues.get_mut(operation) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().map(Stub::duplicate),
            None => None,
        };
        match stub {
            Some(stub) => stub.into_result(),
            None => Ok(http::Response::new(Bytes::new())),
        }
    }

    fn push(&self, operation: String, stub: Stub) {
        self.queues.lock().entry(operation).or_default().push_back(stub);
    }
}

impl std::fmt::Debug for Stubs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queues = self.queues.lock();
        let mut map = f.debug_map();
        for (operation, queue) in queues.iter() {
            map.entry(operation, &queue.len());
        }
        map.finish()
    }
}
