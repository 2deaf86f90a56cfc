//! The per-call logging span.

use std::fmt::Display;

/// Creates the `operation` span every call runs under.
///
/// Middleware logs with `parent: ctx.span()`, so every event of one call
/// carries its operation name and invocation id.
pub fn operation_span(operation: &str, invocation_id: impl Display) -> tracing::Span {
    tracing::info_span!(
        "operation",
        operation = %operation,
        invocation_id = %invocation_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_without_subscriber_is_disabled() {
        let span = operation_span("GetWidget", "0190-abc");
        assert!(span.is_disabled());
    }
}
