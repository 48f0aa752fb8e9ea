use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Body returned by the liveness route
pub const HEALTH_BODY: &str = "BellKeeper Twilio relay is running\n";

/// Liveness check used by the hosting platform.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        HEALTH_BODY,
    )
}

/// Root route for any method.
///
/// WebSocket upgrades are only accepted on `/twilio`, so an upgrade attempt
/// here is answered like an unknown path.
pub async fn root(headers: HeaderMap) -> Response {
    if is_websocket_upgrade(&headers) {
        return not_found().await.into_response();
    }
    health_check().await.into_response()
}

/// Fallback for every unrouted path.
pub async fn not_found() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_upgrade_header_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_websocket_upgrade(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(is_websocket_upgrade(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_websocket_upgrade(&headers));
    }
}
