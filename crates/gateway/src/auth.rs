//! Authentication gate for worker routes.
//!
//! Reads only the worker token for the request. Requirements are loaded
//! later by the handlers that need them, so a broken requirement cannot turn
//! a rejected token into a server error.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the shared worker token.
pub const WORKER_TOKEN_HEADER: &str = "x-worker-token";

/// Middleware rejecting requests without a valid worker token with a bare
/// 403. Runs before any queue or version logic.
pub async fn require_worker_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state.config_source().worker_token().await?;
    dispatch::authorize(
        expected.as_ref(),
        single_header(request.headers(), WORKER_TOKEN_HEADER),
    )?;
    Ok(next.run(request).await)
}

/// Returns the header value only if exactly one instance is present.
fn single_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let mut values = headers.get_all(name).iter();
    match (values.next(), values.next()) {
        (Some(value), None) => value.to_str().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn single_header_requires_exactly_one_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(single_header(&headers, WORKER_TOKEN_HEADER), None);

        headers.insert(WORKER_TOKEN_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(single_header(&headers, WORKER_TOKEN_HEADER), Some("abc"));

        headers.append(WORKER_TOKEN_HEADER, HeaderValue::from_static("def"));
        assert_eq!(single_header(&headers, WORKER_TOKEN_HEADER), None);
    }
}
