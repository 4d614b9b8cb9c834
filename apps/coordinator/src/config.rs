//! Process-level configuration: network ports, the store path, and the
//! legacy-unauthenticated-hello flag (§9). The Credit Engine's own
//! environment-driven configuration lives in `gridx_credit_engine::config`
//! and is loaded separately by the kernel.

use std::env;

const DEFAULT_HTTP_PORT: u16 = 8081;
const DEFAULT_WS_PORT: u16 = 8080;
const DEFAULT_DB_PATH: &str = "gridx.db";

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub http_port: u16,
    pub ws_port: u16,
    pub db_path: String,
    pub db_auth_token: Option<String>,
    /// §9: production deployments should gate the legacy unauthenticated
    /// hello path behind a flag; default off.
    pub allow_unauthenticated_hello: bool,
    pub watchdog_check_interval_seconds: u64,
    pub watchdog_heartbeat_timeout_seconds: u64,
}

impl CoordinatorConfig {
    pub fn from_env() -> Self {
        Self {
            http_port: parse_port("GRIDX_HTTP_PORT", DEFAULT_HTTP_PORT),
            ws_port: parse_port("GRIDX_WS_PORT", DEFAULT_WS_PORT),
            db_path: env::var("GRIDX_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            db_auth_token: env::var("GRIDX_DB_AUTH_TOKEN").ok(),
            allow_unauthenticated_hello: env::var("GRIDX_ALLOW_UNAUTHENTICATED_HELLO")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            watchdog_check_interval_seconds: 15,
            watchdog_heartbeat_timeout_seconds: 30,
        }
    }
}

fn parse_port(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
