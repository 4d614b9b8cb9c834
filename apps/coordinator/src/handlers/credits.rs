//! `GET /credits/{user_id}` (§6).

use axum::extract::{Path, State};
use axum::Json;
use gridx_domain_models::validation;
use serde::Serialize;
use tracing::instrument;

use crate::errors::ApiError;
use crate::state::{now, AppState};

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub user_id: String,
    pub balance: f64,
    pub timestamp: f64,
}

/// Reads the balance without creating a row for an unknown user (§9
/// resolved open question — only submission or a worker hello for a new
/// owner create `UserCredits`/`UserAuth` rows).
#[instrument(skip(state))]
pub async fn get_credits(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CreditsResponse>, ApiError> {
    if !validation::is_valid_user_id(&user_id) {
        return Err(ApiError::InvalidInput("invalid user_id".into()));
    }

    let balance = state.store.get_balance(&user_id).await?;
    Ok(Json(CreditsResponse { user_id, balance, timestamp: now() }))
}
