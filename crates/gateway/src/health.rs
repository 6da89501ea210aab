//! Health check and root redirect.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::AppState;

/// Health check handler.
///
/// Returns 200 OK with the text "OK". Touches neither the store nor the
/// configuration.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// `GET /`: 302 Found to the configured documentation URL, or 404 when none
/// is configured.
pub async fn root_redirect(State(state): State<AppState>) -> Response {
    match state.docs_url() {
        Some(url) => (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_returns_200_ok() {
        let (status, body) = health_handler().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }
}
