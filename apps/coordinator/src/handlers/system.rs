//! `GET /health`, `GET /status` (§6).

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::instrument;

use crate::errors::ApiError;
use crate::state::{now, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: f64,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", timestamp: now() })
}

#[derive(Debug, Serialize)]
pub struct WorkerCounts {
    pub total: usize,
    pub active: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub workers: WorkerCounts,
    pub queue_size: usize,
    pub timestamp: f64,
}

/// `active` counts live sessions in the Registry (I1); `total` counts every
/// worker row the Store has ever seen, including offline ones.
#[instrument(skip(state))]
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let (active, _idle) = state.registry.counts();
    let total = state.store.list_workers().await?.len();

    Ok(Json(StatusResponse {
        workers: WorkerCounts { total, active },
        queue_size: state.queue.len(),
        timestamp: now(),
    }))
}
