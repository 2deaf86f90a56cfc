//! Pipeline metrics.
//!
//! Recording is a no-op until the application installs a `metrics` recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Duration;

/// Completed calls by outcome.
pub const OPERATIONS_TOTAL: &str = "pylon_operations_total";
/// Call latency including retries and back-off.
pub const OPERATION_DURATION_SECONDS: &str = "pylon_operation_duration_seconds";
/// Transport attempts.
pub const OPERATION_ATTEMPTS_TOTAL: &str = "pylon_operation_attempts_total";
/// Retries by failure kind.
pub const RETRIES_TOTAL: &str = "pylon_retries_total";
/// Calls that found no viable auth option.
pub const AUTH_FAILURES_TOTAL: &str = "pylon_auth_failures_total";

/// Registers descriptions for every Pylon metric.
pub fn describe_metrics() {
    describe_counter!(OPERATIONS_TOTAL, Unit::Count, "Total number of completed operation calls");
    describe_histogram!(
        OPERATION_DURATION_SECONDS,
        Unit::Seconds,
        "Operation call duration in seconds, retries included"
    );
    describe_counter!(
        OPERATION_ATTEMPTS_TOTAL,
        Unit::Count,
        "Total number of transport attempts"
    );
    describe_counter!(RETRIES_TOTAL, Unit::Count, "Total number of retried attempts by kind");
    describe_counter!(
        AUTH_FAILURES_TOTAL,
        Unit::Count,
        "Total number of calls with no viable auth option"
    );
}

/// Records a completed call.
///
/// `outcome` is `success` or a short error label such as `transport`.
pub fn record_operation(operation: &str, outcome: &'static str, duration: Duration) {
    counter!(
        OPERATIONS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        OPERATION_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records one transport attempt.
pub fn record_attempt(operation: &str) {
    counter!(OPERATION_ATTEMPTS_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// Records a retry of kind `kind` (e.g. `throttling`).
pub fn record_retry(operation: &str, kind: &str) {
    counter!(
        RETRIES_TOTAL,
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Records a call that failed auth resolution.
pub fn record_auth_failure(operation: &str) {
    counter!(AUTH_FAILURES_TOTAL, "operation" => operation.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_dont_panic() {
        describe_metrics();
        record_operation("GetWidget", "success", Duration::from_millis(12));
        record_attempt("GetWidget");
        record_retry("GetWidget", "throttling");
        record_auth_failure("GetWidget");
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(OPERATIONS_TOTAL, "pylon_operations_total");
        assert_eq!(RETRIES_TOTAL, "pylon_retries_total");
    }
}
