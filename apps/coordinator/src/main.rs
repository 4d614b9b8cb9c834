//! Coordinator process entry point: loads configuration, connects the
//! Store, spawns the Watchdog, and serves the worker channel and the HTTP
//! API on their two configured ports (§6).

use std::net::SocketAddr;

use gridx_coordinator::config::CoordinatorConfig;
use gridx_coordinator::routes::{http_router, ws_router};
use gridx_coordinator::services::watchdog;
use gridx_coordinator::state::AppState;
use gridx_credit_engine::{CreditEngine, CreditEngineConfig};
use gridx_infra_store::Store;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    gridx_telemetry::init_tracing("gridx_coordinator");

    let config = CoordinatorConfig::from_env();
    let credit_config = CreditEngineConfig::from_env().expect("invalid credit engine configuration");

    let store = Store::connect(&config.db_path, config.db_auth_token.clone())
        .await
        .expect("failed to connect to the store");
    let credit_engine = CreditEngine::new(credit_config, store.clone());

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let ws_addr = SocketAddr::from(([0, 0, 0, 0], config.ws_port));

    let state = AppState::new(store, credit_engine, config);

    watchdog::spawn(state.clone());

    let http_listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .expect("failed to bind the HTTP listener");
    let ws_listener = tokio::net::TcpListener::bind(ws_addr)
        .await
        .expect("failed to bind the worker-channel listener");

    info!(%http_addr, %ws_addr, "coordinator listening");

    let http_server = axum::serve(http_listener, http_router(state.clone()));
    let ws_server = axum::serve(ws_listener, ws_router(state));

    tokio::select! {
        result = http_server => {
            if let Err(err) = result {
                error!(%err, "http server exited");
            }
        }
        result = ws_server => {
            if let Err(err) = result {
                error!(%err, "worker-channel server exited");
            }
        }
    }
}
