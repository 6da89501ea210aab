//! Webhook ingestion handlers.
//!
//! Deliveries are not verified or interpreted: the body is parsed as JSON,
//! wrapped in a [`dispatch::WebhookEnvelope`] and appended to the shared
//! webhook queue before 202 Accepted is returned.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use dispatch::{parse_payload, EventType, ServiceName};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Header name for GitHub event type.
const HEADER_GITHUB_EVENT: &str = "x-github-event";

/// Event-name headers checked in order on the generic route. The first one
/// present wins.
const PROVIDER_EVENT_HEADERS: [&str; 5] = [
    HEADER_GITHUB_EVENT,
    "x-gitlab-event",
    "x-event-key",
    "x-gitea-event",
    "x-gogs-event",
];

fn first_header<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

async fn enqueue(
    state: &AppState,
    service: ServiceName,
    event_type: EventType,
    body: &[u8],
) -> Result<StatusCode, ApiError> {
    let payload = parse_payload(body)?;
    state
        .webhooks()
        .ingest(service, event_type, payload)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /webhooks/{slug}`
///
/// The slug becomes the envelope's `service`. The event type comes from the
/// first provider header present (GitHub, GitLab, Bitbucket, Gitea, Gogs).
#[instrument(skip_all, fields(request_id = %Uuid::new_v4(), service = %slug))]
pub async fn service_webhook(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let Some(service) = ServiceName::new(slug) else {
        debug!("Webhook with empty service slug");
        return Ok(StatusCode::NOT_FOUND);
    };
    let event_type = EventType::from_header(first_header(&headers, &PROVIDER_EVENT_HEADERS));
    enqueue(&state, service, event_type, &body).await
}

/// `POST /webhooks/github`
///
/// Only `X-GitHub-Event` is consulted for the event type.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4(), service = ServiceName::GITHUB))]
pub async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let event_type = EventType::from_header(first_header(&headers, &[HEADER_GITHUB_EVENT]));
    enqueue(&state, ServiceName::github(), event_type, &body).await
}
