//! Client construction errors.

use pylon_config::ConfigError;
use thiserror::Error;

/// Errors raised while building a [`Client`](crate::Client).
///
/// Failures of individual calls are reported through
/// [`Output::error`](pylon_core::Output) instead.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The default HTTP client could not be created.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// An operation path could not be joined onto the endpoint.
    #[error("invalid request URI '{uri}': {reason}")]
    InvalidUri {
        /// The URI that failed to parse.
        uri: String,
        /// Why it failed.
        reason: String,
    },
}

impl ClientError {
    /// Creates an invalid URI error.
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}
