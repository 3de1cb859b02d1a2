//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed ledger metrics, and an async HTTP
//! exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

/// Ledger-related Prometheus metrics.
///
/// These are registered into a [`Registry`] and updated from core
/// dispatch and the mining loop.
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Entries admitted to the pending pool.
    pub entries_admitted: IntCounter,
    /// Entries rejected, for any reason, at submission time.
    pub entries_rejected: IntCounter,
    /// Entries rejected specifically by the semantic firewall.
    pub entries_rejected_sanitizer: IntCounter,
    /// Entries rejected specifically by the validator.
    pub entries_rejected_validator: IntCounter,
    /// Current pending pool depth, sampled at submit/mine time.
    pub pool_depth: prometheus::Gauge,
    /// Wall-clock time spent sealing a block (nonce search + append).
    pub block_sealing_seconds: Histogram,
    /// Wall-clock time spent answering a search query (lexical or semantic).
    pub search_seconds: Histogram,
    /// Generations the embedding index currently lags the chain tip by.
    pub embedding_generation_lag: prometheus::Gauge,
    /// Blocks appended to the chain.
    pub blocks_sealed: IntCounter,
}

impl LedgerMetrics {
    /// Registers ledger metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let entries_admitted = IntCounter::with_opts(Opts::new(
            "entries_admitted_total",
            "Total number of entries admitted to the pending pool",
        ))?;
        registry.register(Box::new(entries_admitted.clone()))?;

        let entries_rejected = IntCounter::with_opts(Opts::new(
            "entries_rejected_total",
            "Total number of entries rejected at submission time",
        ))?;
        registry.register(Box::new(entries_rejected.clone()))?;

        let entries_rejected_sanitizer = IntCounter::with_opts(Opts::new(
            "entries_rejected_sanitizer_total",
            "Total number of entries rejected by the semantic firewall",
        ))?;
        registry.register(Box::new(entries_rejected_sanitizer.clone()))?;

        let entries_rejected_validator = IntCounter::with_opts(Opts::new(
            "entries_rejected_validator_total",
            "Total number of entries rejected by the validator port",
        ))?;
        registry.register(Box::new(entries_rejected_validator.clone()))?;

        let pool_depth = prometheus::Gauge::with_opts(Opts::new(
            "pool_depth",
            "Current number of entries waiting in the pending pool",
        ))?;
        registry.register(Box::new(pool_depth.clone()))?;

        let block_sealing_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "block_sealing_seconds",
                "Time to seal a block (nonce search plus chain append) in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
        )?;
        registry.register(Box::new(block_sealing_seconds.clone()))?;

        let search_seconds = Histogram::with_opts(
            HistogramOpts::new("search_seconds", "Time to answer a search query in seconds")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;
        registry.register(Box::new(search_seconds.clone()))?;

        let embedding_generation_lag = prometheus::Gauge::with_opts(Opts::new(
            "embedding_generation_lag",
            "Generations the embedding index lags behind the chain tip",
        ))?;
        registry.register(Box::new(embedding_generation_lag.clone()))?;

        let blocks_sealed = IntCounter::with_opts(Opts::new(
            "blocks_sealed_total",
            "Total number of blocks appended to the chain",
        ))?;
        registry.register(Box::new(blocks_sealed.clone()))?;

        Ok(Self {
            entries_admitted,
            entries_rejected,
            entries_rejected_sanitizer,
            entries_rejected_validator,
            pool_depth,
            block_sealing_seconds,
            search_seconds,
            embedding_generation_lag,
            blocks_sealed,
        })
    }
}

/// Wrapper around a Prometheus registry and the ledger metrics.
///
/// This is the main handle passed around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub ledger: LedgerMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the ledger metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("ledger".to_string()), None)?;
        let ledger = LedgerMetrics::register(&registry)?;
        Ok(Self { registry, ledger })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}
