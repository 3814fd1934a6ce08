//! promlazy demo server
//!
//! Loads metric batches from YAML, simulates work for the enabled modules
//! only, and serves the registry so the deferral is visible on `/metrics`.
//!
//! Environment:
//! - `PROMLAZY_CONFIG`  : batch definitions (default `promlazy.yaml`)
//! - `PROMLAZY_LISTEN`  : bind address (default `127.0.0.1:9898`)
//! - `PROMLAZY_ENABLED` : comma-separated batch names to drive
//! - `PROMLAZY_TICK_MS` : workload interval (default 1000)

mod app_state;
mod ops;
mod workload;

use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Router};
use tracing_subscriber::{fmt, EnvFilter};

use promlazy::config;

use crate::app_state::AppState;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg_path = env_or("PROMLAZY_CONFIG", "promlazy.yaml");
    let cfg = config::load_from_file(&cfg_path).expect("config load failed");
    let listen: SocketAddr = env_or("PROMLAZY_LISTEN", "127.0.0.1:9898")
        .parse()
        .expect("PROMLAZY_LISTEN must be a valid SocketAddr");
    let tick_ms: u64 = env_or("PROMLAZY_TICK_MS", "1000")
        .parse()
        .expect("PROMLAZY_TICK_MS must be an integer");
    let enabled: HashSet<String> = env_or("PROMLAZY_ENABLED", "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let state = AppState::new(&cfg, enabled).expect("metric batches failed to build");
    tokio::spawn(workload::run(state.clone(), Duration::from_millis(tick_ms.max(1))));

    let app = Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state);

    tracing::info!(%listen, config = %cfg_path, "promlazy-demo starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app).await.expect("server failed");
}
