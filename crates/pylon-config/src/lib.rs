//! Typed configuration for Pylon clients.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use pylon_config::ConfigLoader;
//!
//! # fn main() -> Result<(), pylon_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("pylon.toml")?
//!     .with_env_prefix("PYLON")
//!     .load()?;
//!
//! println!("calling {:?}", config.endpoint);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! endpoint = "https://widgets.example.com"
//! stub_responses = false
//! validate_input = true
//!
//! [retry]
//! max_attempts = 3
//! initial_quota = 500
//! retry_cost = 5
//! timeout_retry_cost = 10
//! no_retry_increment = 1
//! base_backoff_ms = 1000
//! max_backoff_ms = 20000
//!
//! [http]
//! connect_timeout_ms = 10000
//! operation_timeout_ms = 30000
//!
//! [logging]
//! level = "warn"
//! format = "pretty"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every key can be overridden with `PREFIX__SECTION__KEY`:
//!
//! - `PYLON__ENDPOINT=https://staging.example.com`
//! - `PYLON__RETRY__MAX_ATTEMPTS=5`
//! - `PYLON__LOGGING__FORMAT=json`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use pylon_telemetry::LogFormat;
pub use schema::{HttpSettings, LoggingConfig, RetrySettings};
