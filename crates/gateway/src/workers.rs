//! Fleet inspection endpoint.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use dispatch::{DispatchError, HostId, Timestamp};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct WorkersResponse {
    pub workers: BTreeMap<HostId, Timestamp>,
}

/// `GET /workers`: every host that has fetched, with its last-seen time.
///
/// Token-protected but not version-gated.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn workers_handler(
    State(state): State<AppState>,
) -> Result<Json<WorkersResponse>, ApiError> {
    let workers = state
        .dispatcher()
        .tracker()
        .all()
        .await
        .map_err(DispatchError::from)?;
    Ok(Json(WorkersResponse { workers }))
}
