//! `ApiError` (§7): the HTTP-facing error surface. Grounded in the
//! teacher's pattern of mapping a domain/store error straight to a status
//! code and a small JSON body at the handler boundary, rather than letting
//! `StoreError`/`CreditEngineError` leak their internals to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gridx_credit_engine::CreditEngineError;
use gridx_infra_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("insufficient credits")]
    InsufficientCredits,
    #[error("not found")]
    NotFound,
    #[error("internal error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::InsufficientCredits => (StatusCode::PAYMENT_REQUIRED, self.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Internal(message) => {
                error!(%message, "internal error surfaced to client");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CreditEngineError> for ApiError {
    fn from(err: CreditEngineError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
