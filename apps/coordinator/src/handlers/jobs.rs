//! `POST /jobs`, `GET /jobs`, `GET /jobs/{id}` (§6).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gridx_domain_models::job::{Job, JobLimits, Language};
use gridx_domain_models::validation;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::services::scheduler;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub user_id: String,
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub limits: Option<SubmitJobLimitsRequest>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitJobLimitsRequest {
    #[serde(default)]
    pub timeout_s: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub status: &'static str,
    pub reserved: f64,
}

/// `POST /jobs`. Reserves credits, persists the job, enqueues it, and
/// triggers a dispatcher tick so a job can be placed in the same request
/// if a worker happens to be idle already. If job creation fails after the
/// reservation already succeeded, the reservation is refunded before
/// returning (§7 Internal).
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    if !validation::is_valid_user_id(&request.user_id) {
        return Err(ApiError::InvalidInput("invalid user_id".into()));
    }

    let language = match request.language.as_deref() {
        None => Language::Python,
        Some(raw) => Language::parse(raw)
            .ok_or_else(|| ApiError::InvalidInput(format!("unsupported language: {raw}")))?,
    };

    let code = validation::sanitize_string(&request.code, validation::MAX_CODE_BYTES);
    if code.is_empty() {
        return Err(ApiError::InvalidInput("code must not be empty".into()));
    }

    let timeout_seconds = request.limits.as_ref().and_then(|limits| limits.timeout_s);
    let limits = JobLimits { timeout_seconds, cpus: None, memory: None };
    let reserved = state.credit_engine.max_reserve(timeout_seconds);

    if !state.credit_engine.reserve(&request.user_id, reserved).await? {
        return Err(ApiError::InsufficientCredits);
    }

    let job_id = Uuid::new_v4();
    if let Err(err) = state
        .store
        .create_job(job_id, &request.user_id, &code, language, &limits, reserved)
        .await
    {
        warn!(%job_id, %err, "submit_job: job creation failed after reservation, refunding");
        if let Err(refund_err) = state.credit_engine.refund(&request.user_id, reserved).await {
            error!(%job_id, %refund_err, "submit_job: refund after failed creation also failed");
        }
        return Err(ApiError::Internal(err.to_string()));
    }

    state.queue.enqueue(job_id);
    scheduler::dispatch(&state).await;

    Ok((StatusCode::CREATED, Json(SubmitJobResponse { job_id, status: "queued", reserved })))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub user_id: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// `GET /jobs?user_id=&limit=`, newest first, capped at 100 (§6).
#[instrument(skip(state))]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<Job>>, ApiError> {
    if !validation::is_valid_user_id(&query.user_id) {
        return Err(ApiError::InvalidInput("invalid user_id".into()));
    }

    let limit = query.limit.unwrap_or(validation::MAX_JOBS_LIST_LIMIT as i64);
    let limit = limit.clamp(1, validation::MAX_JOBS_LIST_LIMIT as i64);
    let jobs = state.store.list_jobs_by_submitter(&query.user_id, limit).await?;
    Ok(Json(jobs))
}

/// `GET /jobs/{id}`.
#[instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job_id = validation::parse_uuid(&raw_id).ok_or_else(|| ApiError::InvalidInput("invalid job id".into()))?;
    let job = state.store.get_job(job_id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(job))
}
