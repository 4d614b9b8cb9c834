//! `tracing` initialization shared by the coordinator binary (§6 AMBIENT
//! logging). Compact output in development, flattened JSON in release,
//! filtered by `GRIDX_LOG_LEVEL` with a per-target fallback.

use std::panic;

use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global subscriber and a panic hook that logs through it.
/// Panics if a global subscriber is already installed — this is meant to be
/// called exactly once, at process startup.
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_env("GRIDX_LOG_LEVEL").unwrap_or_else(|_| {
        let level = if cfg!(debug_assertions) { "debug" } else { "info" };
        format!("{service_name}={level},tower_http=warn,axum=warn,libsql=warn").into()
    });

    if cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    }

    let service = service_name.to_string();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string panic payload>");

        error!(target: "panic", service = %service, location = %location, "panic: {payload}");
    }));

    info!(service = %service_name, "tracing initialized");
}
