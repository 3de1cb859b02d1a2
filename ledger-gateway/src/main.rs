// ledger-gateway/src/main.rs

//! Gateway binary.
//!
//! This binary exposes a small HTTP API on top of the `ledger` crate:
//!
//! - `GET /health`
//! - `POST /entries`
//! - `POST /mine`
//!
//! It embeds an in-memory [`ledger::LedgerCore`] and a Prometheus metrics
//! exporter on `/metrics`. The core is synchronous and internally locked;
//! handlers reach it via `tokio::task::spawn_blocking` rather than an
//! async-aware wrapper.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;

use ledger::chain::ChainStore;
use ledger::config::LedgerConfig;
use ledger::pool::PendingPool;
use ledger::sanitizer::Sanitizer;
use ledger::search::EmbeddingIndex;
use ledger::validator::{HeuristicValidator, ValidatorPort};
use ledger::{run_prometheus_http_server, LedgerCore, MetricsRegistry};

use config::GatewayConfig;
use routes::{entries, health, mine};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ledger_gateway=info,ledger=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let gateway_cfg = GatewayConfig::default();
    let ledger_cfg = LedgerConfig::default();

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialize metrics registry: {e}"))?,
    );

    if ledger_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = ledger_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!(%addr, "metrics exporter listening on /metrics");
    }

    // The gateway wires a deterministic heuristic validator by default so
    // it can run standalone without an external LLM-mediation service;
    // production deployments point `ledger_cfg.validator` at an HTTP or
    // quorum validator instead (see `ledger::config::ValidatorConfig`).
    let validator: Arc<dyn ValidatorPort> = Arc::new(HeuristicValidator::new());

    let chain = ChainStore::new(Box::new(ledger_cfg.mining.difficulty()));
    let pool = PendingPool::new(ledger_cfg.pool.soft_cap);
    let sanitizer = Sanitizer::new(ledger_cfg.sanitizer.max_len);
    let embedding = EmbeddingIndex::new(ledger_cfg.embedding.dimension);

    let core = Arc::new(LedgerCore::new(
        sanitizer,
        validator,
        pool,
        chain,
        embedding,
        metrics.clone(),
        ledger_cfg.mining.budget,
        ledger_cfg.entry_limits.max_content_len,
        ledger_cfg.entry_limits.max_author_len,
        ledger_cfg.entry_limits.max_intent_len,
    ));

    let app_state: SharedState = Arc::new(AppState { core, metrics });

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/entries", post(entries::submit_entry))
        .route("/mine", post(mine::mine))
        .with_state(app_state);

    tracing::info!("gateway listening on http://{}", gateway_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(gateway_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", gateway_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("gateway server error: {e}"))?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
