//! Job fetch handlers.
//!
//! A worker polls `GET /fetch` (default queue) or `GET /fetch/{queue}` and
//! receives at most one job. Authentication has already happened in
//! [`crate::auth::require_worker_token`]. The handlers load the current
//! requirements; the version gate and the pop run in
//! [`dispatch::Dispatcher::fetch`].

use axum::extract::{Path, State};
use axum::Json;
use dispatch::{Job, QueueName};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::Worker;
use crate::AppState;

/// Response body of a fetch: `{"job": null}` when the queue is empty.
#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub job: Option<Job>,
}

/// `GET /fetch`
#[instrument(
    skip_all,
    fields(request_id = %Uuid::new_v4(), queue = QueueName::DEFAULT, host = %worker.host)
)]
pub async fn fetch_default(
    State(state): State<AppState>,
    Worker(worker): Worker,
) -> Result<Json<FetchResponse>, ApiError> {
    let requirements = state.config_source().requirements().await?;
    let job = state
        .dispatcher()
        .fetch(&requirements, &worker, &QueueName::default_queue())
        .await?;
    Ok(Json(FetchResponse { job }))
}

/// `GET /fetch/{queue}`
#[instrument(
    skip_all,
    fields(request_id = %Uuid::new_v4(), queue = %queue, host = %worker.host)
)]
pub async fn fetch_named(
    State(state): State<AppState>,
    Path(queue): Path<String>,
    Worker(worker): Worker,
) -> Result<Json<FetchResponse>, ApiError> {
    let queue = QueueName::from_segment(Some(&queue));
    let requirements = state.config_source().requirements().await?;
    let job = state
        .dispatcher()
        .fetch(&requirements, &worker, &queue)
        .await?;
    Ok(Json(FetchResponse { job }))
}
