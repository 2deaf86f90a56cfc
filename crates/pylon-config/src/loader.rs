//! Layered configuration loading.
//!
//! Later layers override earlier ones:
//! 1. Default values (or a preset)
//! 2. Configuration file or string (TOML or JSON)
//! 3. Environment variables `PREFIX__SECTION__KEY`
//!
//! A file only overrides the keys it sets; everything else keeps the value
//! from the layer below.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ClientConfig, ConfigError, LogFormat};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "PYLON";

/// Configuration loader with layered approach.
///
/// # Example
///
/// ```no_run
/// use pylon_config::ConfigLoader;
///
/// # fn main() -> Result<(), pylon_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()
///     .with_optional_file("pylon.toml")?
///     .with_env_prefix("PYLON")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: ClientConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            env_prefix: None,
        }
    }

    /// Start from an explicit base configuration, e.g. a preset.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::{ClientConfig, ConfigLoader};
    ///
    /// let config = ConfigLoader::new()
    ///     .with_base(ClientConfig::testing())
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.stub_responses);
    /// ```
    #[must_use]
    pub fn with_base(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Layer a configuration file on top.
    ///
    /// The format is taken from the extension (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unsupported extension, does not parse, or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.with_string(&content, &format)
    }

    /// Layer a configuration file on top if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layer configuration text on top.
    ///
    /// `format` is `"toml"` or `"json"`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or a field is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use pylon_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     endpoint = "https://widgets.example.com"
    ///
    ///     [retry]
    ///     max_attempts = 5
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.retry.max_attempts, 5);
    /// assert_eq!(config.retry.initial_quota, 500);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let overlay: Value = match format.to_lowercase().as_str() {
            "toml" => serde_json::to_value(toml::from_str::<toml::Value>(content)?)?,
            "json" => serde_json::from_str(content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, overlay);
        self.config = serde_json::from_value(merged)?;
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// With prefix `PYLON`, `PYLON__RETRY__MAX_ATTEMPTS=5` sets
    /// `retry.max_attempts`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if present.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        // A missing .env is not an error.
        let _ = dotenvy::dotenv();
        self
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation fails.
    pub fn load(mut self) -> Result<ClientConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: HashMap<String, String> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            self.apply_env_vars(&prefix, &vars)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> ClientConfig {
        self.config
    }

    fn apply_env_vars(
        &mut self,
        prefix: &str,
        vars: &HashMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            self.apply_env_var(key, value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(path) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            // Shares the prefix but is not one of ours, e.g. PYLONS_HOME.
            return Ok(());
        };

        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["ENDPOINT"] => {
                config.endpoint = optional_string(value);
            }
            ["STUB_RESPONSES"] => config.stub_responses = parse_bool_var(key, value)?,
            ["VALIDATE_INPUT"] => config.validate_input = parse_bool_var(key, value)?,

            ["RETRY", "MAX_ATTEMPTS"] => config.retry.max_attempts = parse_var(key, value)?,
            ["RETRY", "INITIAL_QUOTA"] => config.retry.initial_quota = parse_var(key, value)?,
            ["RETRY", "RETRY_COST"] => config.retry.retry_cost = parse_var(key, value)?,
            ["RETRY", "TIMEOUT_RETRY_COST"] => {
                config.retry.timeout_retry_cost = parse_var(key, value)?;
            }
            ["RETRY", "NO_RETRY_INCREMENT"] => {
                config.retry.no_retry_increment = parse_var(key, value)?;
            }
            ["RETRY", "BASE_BACKOFF_MS"] => config.retry.base_backoff_ms = parse_var(key, value)?,
            ["RETRY", "MAX_BACKOFF_MS"] => config.retry.max_backoff_ms = parse_var(key, value)?,

            ["HTTP", "CONNECT_TIMEOUT_MS"] => {
                config.http.connect_timeout_ms = parse_var(key, value)?;
            }
            ["HTTP", "OPERATION_TIMEOUT_MS"] => {
                config.http.operation_timeout_ms = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(parse_var(key, value)?)
                };
            }

            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            _ => {}
        }

        Ok(())
    }
}

/// Recursively overlays `overlay` onto `base`; objects merge, other values replace.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn optional_string(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_string_overlay_keeps_unset_keys() {
        let config = ConfigLoader::new()
            .with_base(ClientConfig::development())
            .with_string("[retry]\nmax_attempts = 4", "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.retry_cost, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_json_string() {
        let json = r#"{"stub_responses": true, "http": {"operation_timeout_ms": 2500}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert!(config.stub_responses);
        assert_eq!(config.http.operation_timeout_ms, Some(2500));
        assert_eq!(config.http.connect_timeout_ms, 10_000);
    }

    #[test]
    fn test_unknown_field_in_file_rejected() {
        let result = ConfigLoader::new().with_string("[retry]\nattempts = 4", "toml");
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: 1", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(f)) if f == "yaml"));
    }

    #[test]
    fn test_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "endpoint = \"https://widgets.example.com\"").unwrap();
        writeln!(file, "validate_input = false").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("https://widgets.example.com"));
        assert!(!config.validate_input);
    }

    #[test]
    fn test_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/pylon.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/pylon.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_vars(
                "TEST",
                &vars(&[
                    ("TEST__ENDPOINT", "https://override.example.com"),
                    ("TEST__RETRY__MAX_ATTEMPTS", "7"),
                    ("TEST__HTTP__OPERATION_TIMEOUT_MS", "1500"),
                    ("TEST__LOGGING__FORMAT", "json"),
                    ("TEST__STUB_RESPONSES", "yes"),
                ]),
            )
            .unwrap();

        let config = loader.load_unvalidated();
        assert_eq!(config.endpoint.as_deref(), Some("https://override.example.com"));
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.http.operation_timeout_ms, Some(1500));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.stub_responses);
    }

    #[test]
    fn test_env_override_beats_file() {
        let mut loader = ConfigLoader::new()
            .with_string("[retry]\nmax_attempts = 4", "toml")
            .unwrap();
        loader
            .apply_env_var("TEST__RETRY__MAX_ATTEMPTS", "2", "TEST")
            .unwrap();
        assert_eq!(loader.load_unvalidated().retry.max_attempts, 2);
    }

    #[test]
    fn test_env_invalid_integer() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_env_var("TEST__RETRY__MAX_ATTEMPTS", "many", "TEST")
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { ref var, .. } if var == "TEST__RETRY__MAX_ATTEMPTS"));
    }

    #[test]
    fn test_env_unrelated_key_ignored() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TESTING_HOME", "/tmp", "TEST").unwrap();
        loader.apply_env_var("TEST__UNKNOWN", "1", "TEST").unwrap();
        assert_eq!(loader.load_unvalidated(), ClientConfig::default());
    }

    #[test]
    fn test_env_operation_timeout_none() {
        let mut loader = ConfigLoader::new().with_string(
            r#"{"http": {"operation_timeout_ms": 10}}"#,
            "json",
        )
        .unwrap();
        loader
            .apply_env_var("TEST__HTTP__OPERATION_TIMEOUT_MS", "none", "TEST")
            .unwrap();
        assert_eq!(loader.load_unvalidated().http.operation_timeout_ms, None);
    }

    #[test]
    fn test_validation_runs_on_load() {
        let result = ConfigLoader::new()
            .with_string("endpoint = \"widgets\"", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { ref field, .. }) if field == "endpoint"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
