//! HTTP mapping of [`DispatchError`].
//!
//! Client-caused failures get a specific status and a stable error code.
//! Everything else becomes a generic 500 and the detail goes to the log
//! only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dispatch::DispatchError;
use serde::Serialize;
use tracing::{debug, error};

/// Message returned to workers turned away by the version gate.
pub const OUTDATED_MESSAGE: &str = "The worker is outdated. Please update.";

/// Wraps a [`DispatchError`] so it can be returned from handlers.
#[derive(Debug)]
pub struct ApiError(pub DispatchError);

impl From<DispatchError> for ApiError {
    fn from(error: DispatchError) -> Self {
        Self(error)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
}

fn error_response(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail { code, message },
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            debug!(error = %self.0, "Request rejected");
        } else {
            error!(error = %self.0, "Request failed");
        }

        match &self.0 {
            DispatchError::AuthRejected => StatusCode::FORBIDDEN.into_response(),
            DispatchError::Outdated { .. } => {
                error_response(StatusCode::BAD_REQUEST, "OUTDATED", OUTDATED_MESSAGE)
            }
            DispatchError::MalformedWebhookBody { .. } => error_response(
                StatusCode::BAD_REQUEST,
                "MALFORMED_BODY",
                "The request body could not be parsed.",
            ),
            DispatchError::StoreUnavailable(_)
            | DispatchError::MalformedQueuedItem { .. }
            | DispatchError::InvalidRequirement { .. }
            | DispatchError::Serialization { .. } => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error.",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch::{Capability, QueueName, StoreError};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    async fn parts(error: DispatchError) -> (StatusCode, Vec<u8>) {
        let response = ApiError(error).into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn auth_rejection_has_no_body() {
        let (status, body) = parts(DispatchError::AuthRejected).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn outdated_message_is_capability_agnostic() {
        for capability in Capability::ALL {
            let (status, body) = parts(DispatchError::Outdated { capability }).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(
                body,
                json!({"error": {"code": "OUTDATED", "message": OUTDATED_MESSAGE}})
            );
        }
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let errors = [
            DispatchError::StoreUnavailable(StoreError::Unavailable {
                operation: "pop_front",
                message: "redis://secret-host:6379 refused".to_string(),
            }),
            DispatchError::MalformedQueuedItem {
                queue: QueueName::default_queue(),
                reason: "expected value at line 1".to_string(),
            },
            DispatchError::Serialization {
                what: "job",
                source: serde_json::from_str::<Value>("{").unwrap_err(),
            },
        ];

        for error in errors {
            let (status, body) = parts(error).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            let text = String::from_utf8(body).unwrap();
            assert!(text.contains("INTERNAL_ERROR"));
            assert!(!text.contains("secret-host"));
            assert!(!text.contains("line 1"));
        }
    }
}
