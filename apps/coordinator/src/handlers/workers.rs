//! `GET /workers`, `POST /workers/register`, heartbeat endpoints (§6).

use axum::extract::{Path, State};
use axum::Json;
use gridx_domain_models::validation;
use gridx_domain_models::worker::{Worker, WorkerCapabilities};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::state::{now, AppState};

/// `GET /workers`.
#[instrument(skip(state))]
pub async fn list_workers(State(state): State<AppState>) -> Result<Json<Vec<Worker>>, ApiError> {
    Ok(Json(state.store.list_workers().await?))
}

#[derive(Debug, Deserialize)]
pub struct RegisterWorkerRequest {
    pub id: String,
    #[serde(default)]
    pub caps: Option<WorkerCapabilities>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterWorkerResponse {
    pub success: bool,
    pub worker_id: Uuid,
    pub status: &'static str,
}

/// `POST /workers/register`. Out-of-band registration for workers that
/// don't (yet) speak the `/ws/worker` hello handshake; upserts the store
/// row directly without touching the live Registry, which only tracks
/// workers with an open session (I1).
#[instrument(skip(state, request))]
pub async fn register_worker(
    State(state): State<AppState>,
    Json(request): Json<RegisterWorkerRequest>,
) -> Result<Json<RegisterWorkerResponse>, ApiError> {
    let worker_id =
        validation::parse_uuid(&request.id).ok_or_else(|| ApiError::InvalidInput("invalid id".into()))?;
    let caps = request.caps.unwrap_or_default();

    state
        .store
        .upsert_worker(worker_id, request.ip.as_deref(), &caps, request.owner_id.as_deref(), None)
        .await?;

    Ok(Json(RegisterWorkerResponse { success: true, worker_id, status: "registered" }))
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub success: bool,
    pub worker_id: Uuid,
    pub timestamp: f64,
}

/// `POST /workers/{id}/heartbeat`.
#[instrument(skip(state))]
pub async fn heartbeat_path(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let worker_id =
        validation::parse_uuid(&raw_id).ok_or_else(|| ApiError::InvalidInput("invalid id".into()))?;
    state.store.update_heartbeat(worker_id).await?;
    Ok(Json(HeartbeatResponse { success: true, worker_id, timestamp: now() }))
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatBodyRequest {
    pub id: String,
}

/// `POST /workers/heartbeat` — same outcome as the path variant, with the
/// worker id carried in the body instead of the URL.
#[instrument(skip(state, request))]
pub async fn heartbeat_body(
    State(state): State<AppState>,
    Json(request): Json<HeartbeatBodyRequest>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let worker_id =
        validation::parse_uuid(&request.id).ok_or_else(|| ApiError::InvalidInput("invalid id".into()))?;
    state.store.update_heartbeat(worker_id).await?;
    Ok(Json(HeartbeatResponse { success: true, worker_id, timestamp: now() }))
}
