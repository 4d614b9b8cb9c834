//! Route composition (§6 AMBIENT), grounded in the teacher's `routes.rs`
//! pattern of nested routers merged under a root with a CORS layer on top.
//! The worker channel and the HTTP API are exposed as two separate
//! `Router`s so they can be served on the two distinct ports §6 names
//! (`GRIDX_WS_PORT`, `GRIDX_HTTP_PORT`).

use std::time::Duration;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use gridx_domain_models::validation;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{credits, jobs, system, workers, ws};
use crate::state::AppState;

/// The submitter-facing JSON API (§6 HTTP API table).
pub fn http_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/jobs", post(jobs::submit_job).get(jobs::list_jobs))
        .route("/jobs/:id", get(jobs::get_job))
        .route("/workers", get(workers::list_workers))
        .route("/workers/register", post(workers::register_worker))
        .route("/workers/heartbeat", post(workers::heartbeat_body))
        .route("/workers/:id/heartbeat", post(workers::heartbeat_path))
        .route("/credits/:user_id", get(credits::get_credits))
        .route("/health", get(system::health))
        .route("/status", get(system::status))
        .layer(RequestBodyLimitLayer::new(validation::MAX_FRAME_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// The worker channel (§6 Worker channel — persistent bidirectional
/// text-frame channel at `/ws/worker`).
pub fn ws_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/worker", get(ws::upgrade_worker_socket))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
