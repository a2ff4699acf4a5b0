// api-gateway/src/main.rs

//! API gateway binary.
//!
//! This binary exposes a small HTTP API on top of the `shardchain` crate:
//!
//! - `GET /health`
//! - `POST /fork-choice`
//!
//! Every fork-choice request carries its own block snapshot, so the
//! gateway keeps no chain state between requests. Resolutions update a
//! shared Prometheus registry served on `/metrics` by a separate exporter.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use config::{ApiConfig, load_chain_config};
use shardchain::{MetricsRegistry, run_prometheus_http_server};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("api_gateway=info,shardchain=info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let api_cfg = ApiConfig::from_env()?;
    let chain_cfg = load_chain_config()?;

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if chain_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = chain_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Shared state + router
    // ---------------------------

    tracing::info!(
        shards = chain_cfg.fork_choice.shard_ids.len(),
        parallel = chain_cfg.fork_choice.parallel,
        "fork choice configured"
    );

    let app_state: SharedState = Arc::new(AppState {
        fork_choice: chain_cfg.fork_choice,
        metrics,
    });
    let app = routes::router(app_state);

    // ---------------------------
    // axum 0.8 server (hyper 1 / tokio 1.48 style)
    // ---------------------------

    tracing::info!("API gateway listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
