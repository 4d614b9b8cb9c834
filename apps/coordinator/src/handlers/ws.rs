//! `/ws/worker` upgrade (§6): hands an accepted socket straight to the
//! Worker Session state machine.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use gridx_domain_models::validation;
use tracing::instrument;

use crate::services::worker_session;
use crate::state::AppState;

#[instrument(skip(upgrade, state))]
pub async fn upgrade_worker_socket(upgrade: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    upgrade
        .max_frame_size(validation::MAX_FRAME_BYTES)
        .on_upgrade(move |socket| worker_session::run(socket, state))
}
