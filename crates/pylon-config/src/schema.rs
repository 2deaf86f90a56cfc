//! Configuration section types.

use pylon_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry and back-off settings.
///
/// # Example
///
/// ```
/// use pylon_config::RetrySettings;
///
/// let retry = RetrySettings::default();
/// assert_eq!(retry.max_attempts, 3);
/// assert_eq!(retry.base_backoff().as_secs(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    /// Maximum attempts per call, the first included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry quota tokens available to each call.
    #[serde(default = "default_initial_quota")]
    pub initial_quota: u32,

    /// Tokens spent on a retry.
    #[serde(default = "default_retry_cost")]
    pub retry_cost: u32,

    /// Tokens spent on a retry after a timeout.
    #[serde(default = "default_timeout_retry_cost")]
    pub timeout_retry_cost: u32,

    /// Tokens refunded by a success that needed no retry.
    #[serde(default = "default_no_retry_increment")]
    pub no_retry_increment: u32,

    /// Back-off base in milliseconds.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Back-off ceiling in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl RetrySettings {
    /// Back-off base as a duration.
    #[must_use]
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    /// Back-off ceiling as a duration.
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_quota: default_initial_quota(),
            retry_cost: default_retry_cost(),
            timeout_retry_cost: default_timeout_retry_cost(),
            no_retry_increment: default_no_retry_increment(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_quota() -> u32 {
    500
}

fn default_retry_cost() -> u32 {
    5
}

fn default_timeout_retry_cost() -> u32 {
    10
}

fn default_no_retry_increment() -> u32 {
    1
}

fn default_base_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    20_000
}

/// Transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HttpSettings {
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-call timeout in milliseconds. None disables it.
    #[serde(default)]
    pub operation_timeout_ms: Option<u64>,
}

impl HttpSettings {
    /// Connect timeout as a duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Whole-call timeout as a duration, if set.
    #[must_use]
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            operation_timeout_ms: None,
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `warn` or `pylon_middleware=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Converts to the telemetry crate's logging setup.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::LoggingConfig;
    ///
    /// let log = LoggingConfig::default().to_log_config();
    /// assert_eq!(log.level, "warn");
    /// ```
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level.clone(),
            format: self.format,
            ..LogConfig::default()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let retry = RetrySettings::default();
        assert_eq!(retry.initial_quota, 500);
        assert_eq!(retry.retry_cost, 5);
        assert_eq!(retry.timeout_retry_cost, 10);
        assert_eq!(retry.no_retry_increment, 1);
        assert_eq!(retry.max_backoff(), Duration::from_secs(20));
    }

    #[test]
    fn test_http_defaults() {
        let http = HttpSettings::default();
        assert_eq!(http.connect_timeout(), Duration::from_secs(10));
        assert_eq!(http.operation_timeout(), None);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let retry: RetrySettings = toml::from_str("max_attempts = 5").unwrap();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_quota, 500);
    }

    #[test]
    fn test_logging_format_lowercase() {
        let logging: LoggingConfig = toml::from_str(r#"format = "json""#).unwrap();
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.to_log_config().format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<HttpSettings, _> = toml::from_str("read_timeout_ms = 5");
        assert!(result.is_err());
    }
}
