//! Structured logging and metrics for Pylon clients.
//!
//! - **Logging**: `tracing` events under a per-call `operation` span, rendered
//!   by a `tracing-subscriber` fmt layer (pretty or JSON)
//! - **Metrics**: counters and histograms through the `metrics` facade; the
//!   application installs whichever recorder it exports with
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `pylon_operations_total` | Counter | `operation`, `outcome` | Completed calls |
//! | `pylon_operation_duration_seconds` | Histogram | `operation` | Call latency, retries included |
//! | `pylon_operation_attempts_total` | Counter | `operation` | Transport attempts |
//! | `pylon_retries_total` | Counter | `operation`, `kind` | Retries by failure kind |
//! | `pylon_auth_failures_total` | Counter | `operation` | Calls with no viable auth option |
//!
//! # Example
//!
//! ```rust,ignore
//! use pylon_telemetry::{init_logging, describe_metrics, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! describe_metrics();
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;
pub mod span;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::describe_metrics;
pub use span::operation_span;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
