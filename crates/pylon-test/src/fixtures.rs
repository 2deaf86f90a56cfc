//! Canned responses.

use bytes::Bytes;
use pylon_core::HttpResponse;
use serde::Serialize;

/// A response with `status` and an empty body.
#[must_use]
pub fn empty_response(status: u16) -> HttpResponse {
    let mut response = http::Response::new(Bytes::new());
    *response.status_mut() = status_code(status);
    response
}

/// A response with `status` and `body` serialized as JSON.
pub fn json_response<T: Serialize + ?Sized>(status: u16, body: &T) -> HttpResponse {
    let body = serde_json::to_vec(body).unwrap_or_default();
    let mut response = http::Response::new(Bytes::from(body));
    *response.status_mut() = status_code(status);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

/// A modeled error response: `{"code": .., "message": ..}`.
#[must_use]
pub fn error_response(status: u16, code: &str, message: &str) -> HttpResponse {
    json_response(
        status,
        &serde_json::json!({
            "code": code,
            "message": message,
        }),
    )
}

/// A `429` throttling response carrying `Retry-After: seconds`.
#[must_use]
pub fn throttled_response(retry_after_secs: u64) -> HttpResponse {
    let mut response = error_response(429, "ThrottlingException", "rate exceeded");
    response
        .headers_mut()
        .insert(http::header::RETRY_AFTER, http::HeaderValue::from(retry_after_secs));
    response
}

fn status_code(status: u16) -> http::StatusCode {
    http::StatusCode::from_u16(status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_response() {
        let response = json_response(201, &serde_json::json!({"id": 1}));
        assert_eq!(response.status(), 201);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.body().as_ref(), br#"{"id":1}"#);
    }

    #[test]
    fn test_error_response() {
        let response = error_response(404, "WidgetNotFound", "gone");
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["code"], "WidgetNotFound");
        assert_eq!(body["message"], "gone");
    }

    #[test]
    fn test_throttled_response() {
        let response = throttled_response(2);
        assert_eq!(response.status(), 429);
        assert_eq!(response.headers()["retry-after"], "2");
    }
}
