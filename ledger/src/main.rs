// src/main.rs
//
// Minimal demo node that wires up the ledger library:
//
// - in-memory chain store with leading-zeros difficulty
// - validator port selected from config (heuristic, HTTP, or quorum)
// - Prometheus metrics exporter on /metrics
// - a loop that mines the pending pool at a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use ledger::chain::ChainStore;
use ledger::config::{LedgerConfig, ValidatorConfig};
use ledger::dispatch::{LedgerCore, RequestContext};
use ledger::error::ErrorKind;
use ledger::pool::PendingPool;
use ledger::sanitizer::Sanitizer;
use ledger::search::EmbeddingIndex;
use ledger::validator::{HeuristicValidator, HttpLlmValidator, QuorumValidator, ValidatorPort};
use ledger::{run_prometheus_http_server, MetricsRegistry};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run_node().await {
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}

fn build_validator(cfg: &ValidatorConfig) -> Result<Box<dyn ValidatorPort>, ErrorKind> {
    match cfg {
        ValidatorConfig::Heuristic => Ok(Box::new(HeuristicValidator::new())),
        ValidatorConfig::Http { base_url, timeout, max_retries, backoff_base } => {
            Ok(Box::new(HttpLlmValidator::new(base_url.clone(), *timeout, *max_retries, *backoff_base)?))
        }
        ValidatorConfig::Quorum { members, timeout, max_retries, backoff_base } => {
            let clients: Result<Vec<_>, ErrorKind> = members
                .iter()
                .map(|url| HttpLlmValidator::new(url.clone(), *timeout, *max_retries, *backoff_base))
                .collect();
            Ok(Box::new(QuorumValidator::new(clients?)))
        }
    }
}

async fn run_node() -> Result<(), String> {
    let cfg = LedgerConfig::default();

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialize metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!(%addr, "metrics exporter listening on /metrics");
    }

    let validator: Arc<dyn ValidatorPort> = build_validator(&cfg.validator)
        .map_err(|e| format!("failed to build validator: {e}"))?
        .into();

    let chain = ChainStore::new(Box::new(cfg.mining.difficulty()));
    let pool = PendingPool::new(cfg.pool.soft_cap);
    let sanitizer = Sanitizer::new(cfg.sanitizer.max_len);
    let embedding = EmbeddingIndex::new(cfg.embedding.dimension);

    let core = Arc::new(LedgerCore::new(
        sanitizer,
        validator,
        pool,
        chain,
        embedding,
        metrics.clone(),
        cfg.mining.budget,
        cfg.entry_limits.max_content_len,
        cfg.entry_limits.max_author_len,
        cfg.entry_limits.max_intent_len,
    ));

    tracing::info!(
        leading_zero_hex_digits = cfg.mining.leading_zero_hex_digits,
        "starting node with in-memory chain store"
    );

    let mine_interval = Duration::from_secs(5);
    loop {
        let ctx = RequestContext::new("local-miner");
        match core.mine(&ctx) {
            Ok(block) => {
                tracing::info!(
                    height = block.index,
                    hash = %block.hash.to_hex(),
                    entries = block.entries.len(),
                    "sealed block"
                );
            }
            Err(ErrorKind::NothingToMine) => {}
            Err(e) => tracing::warn!("failed to mine: {e}"),
        }
        tokio::time::sleep(mine_interval).await;
    }
}
