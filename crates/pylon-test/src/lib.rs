//! # Pylon Test
//!
//! Test utilities for Pylon clients. Nothing here opens a socket: the
//! [`MockHttpClient`] answers from a script and records every request it
//! receives.
//!
//! ## Key Features
//!
//! - **Scripted Transport**: Queue responses and transport errors in order
//! - **Latency**: Simulate slow services for timeout and cancellation tests
//! - **Request Recording**: Inspect exactly what the pipeline sent
//! - **Interceptors**: Record hook order or fail at a chosen hook
//! - **Fixtures**: JSON responses and modeled error bodies
//!
//! ## Example
//!
//! ```
//! use pylon_core::HttpClient;
//! use pylon_test::{fixtures, MockHttpClient};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let client = MockHttpClient::new();
//! client.push_response(fixtures::json_response(200, &json!({"id": 7})));
//!
//! let request = http::Request::new(bytes::Bytes::new());
//! let response = client.send(&request).await.unwrap();
//!
//! assert_eq!(response.status(), 200);
//! assert_eq!(client.request_count(), 1);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/pylon-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod fixtures;
mod interceptor;
mod request;

pub use client::MockHttpClient;
pub use error::TestError;
pub use interceptor::{FailingInterceptor, RecordingInterceptor};
pub use request::RecordedRequest;
