//! Main configuration types.
//!
//! This module provides the top-level [`ClientConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, HttpSettings, LoggingConfig, RetrySettings};

/// Complete Pylon client configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use pylon_config::ClientConfig;
///
/// let config = ClientConfig::default();
/// assert!(config.endpoint.is_none());
/// assert!(config.validate_input);
/// assert_eq!(config.retry.max_attempts, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Absolute base URI requests are sent to.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Answer every call from queued stubs instead of the network.
    #[serde(default)]
    pub stub_responses: bool,

    /// Run the input validator before building the request.
    #[serde(default = "default_validate_input")]
    pub validate_input: bool,

    /// Retry and back-off settings.
    #[serde(default)]
    pub retry: RetrySettings,

    /// Transport settings.
    #[serde(default)]
    pub http: HttpSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_validate_input() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            stub_responses: false,
            validate_input: default_validate_input(),
            retry: RetrySettings::default(),
            http: HttpSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::ClientConfig;
    ///
    /// let config = ClientConfig::builder()
    ///     .endpoint("https://widgets.example.com")
    ///     .max_attempts(5)
    ///     .build();
    ///
    /// assert_eq!(config.retry.max_attempts, 5);
    /// ```
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `retry.max_attempts` is zero
    /// - `retry.base_backoff_ms` exceeds `retry.max_backoff_ms`
    /// - `endpoint` is not an absolute URI
    /// - `logging.level` is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid_value(
                "retry.max_attempts",
                "must be at least 1",
            ));
        }

        if self.retry.base_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::invalid_value(
                "retry.base_backoff_ms",
                format!(
                    "{} exceeds retry.max_backoff_ms ({})",
                    self.retry.base_backoff_ms, self.retry.max_backoff_ms
                ),
            ));
        }

        if let Some(endpoint) = &self.endpoint {
            let absolute = endpoint
                .parse::<http::Uri>()
                .map(|uri| uri.scheme().is_some() && uri.authority().is_some())
                .unwrap_or(false);
            if !absolute {
                return Err(ConfigError::invalid_value(
                    "endpoint",
                    format!("not an absolute URI: {endpoint}"),
                ));
            }
        }

        if let Err(err) = pylon_telemetry::logging::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", err.to_string()));
        }

        Ok(())
    }

    /// Parses the endpoint, if one is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the endpoint does not parse.
    pub fn endpoint_uri(&self) -> Result<Option<http::Uri>, ConfigError> {
        self.endpoint
            .as_deref()
            .map(|endpoint| {
                endpoint
                    .parse::<http::Uri>()
                    .map_err(|e| ConfigError::invalid_value("endpoint", e.to_string()))
            })
            .transpose()
    }

    /// Create a development configuration preset.
    ///
    /// Debug-level pretty logs; everything else at defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::ClientConfig;
    ///
    /// let config = ClientConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = crate::LogFormat::Pretty;
        config
    }

    /// Create a testing configuration preset.
    ///
    /// Calls are answered from stubs and retries do not wait.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::ClientConfig;
    ///
    /// let config = ClientConfig::testing();
    /// assert!(config.stub_responses);
    /// assert_eq!(config.retry.base_backoff_ms, 0);
    /// ```
    #[must_use]
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.stub_responses = true;
        config.retry.base_backoff_ms = 0;
        config.retry.max_backoff_ms = 0;
        config
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    /// Enable or disable stubbed responses.
    #[must_use]
    pub fn stub_responses(mut self, enabled: bool) -> Self {
        self.config.stub_responses = enabled;
        self
    }

    /// Enable or disable input validation.
    #[must_use]
    pub fn validate_input(mut self, enabled: bool) -> Self {
        self.config.validate_input = enabled;
        self
    }

    /// Set the maximum number of attempts.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.retry.max_attempts = max_attempts;
        self
    }

    /// Set the retry section.
    #[must_use]
    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the transport section.
    #[must_use]
    pub fn http(mut self, http: HttpSettings) -> Self {
        self.config.http = http;
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        self.config
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<ClientConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = ClientConfig::builder()
            .max_attempts(0)
            .build_validated()
            .unwrap_err();
        assert_eq!(err.field(), Some("retry.max_attempts"));
    }

    #[test]
    fn test_backoff_bounds_must_be_ordered() {
        let config = ClientConfig::builder()
            .retry(RetrySettings {
                base_backoff_ms: 5_000,
                max_backoff_ms: 1_000,
                ..Default::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("retry.base_backoff_ms"));
    }

    #[test]
    fn test_relative_endpoint_rejected() {
        let config = ClientConfig::builder().endpoint("/widgets").build();
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("endpoint"));
        assert!(err.to_string().contains("/widgets"));
    }

    #[test]
    fn test_absolute_endpoint_accepted() {
        let config = ClientConfig::builder()
            .endpoint("https://widgets.example.com:8443/v1")
            .build();
        assert!(config.validate().is_ok());
        let uri = config.endpoint_uri().unwrap().unwrap();
        assert_eq!(uri.host(), Some("widgets.example.com"));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let config = ClientConfig::builder()
            .logging(LoggingConfig {
                level: "pylon=loud".to_string(),
                ..Default::default()
            })
            .build();
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("logging.level"));
    }

    #[test]
    fn test_presets() {
        let dev = ClientConfig::development();
        assert_eq!(dev.logging.level, "debug");
        assert!(!dev.stub_responses);

        let testing = ClientConfig::testing();
        assert!(testing.stub_responses);
        assert!(testing.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ClientConfig::builder()
            .endpoint("https://widgets.example.com")
            .build();
        let text = toml::to_string(&config).unwrap();
        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ClientConfig, _> = toml::from_str("region = \"us-east-1\"");
        assert!(result.is_err());
    }
}
