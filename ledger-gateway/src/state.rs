//! Shared application state.
//!
//! [`LedgerCore`] is a synchronous, internally-locked engine. Handlers
//! reach it through [`tokio::task::spawn_blocking`] rather than holding
//! a `tokio::sync::Mutex` around it, since the core already serializes
//! its own writers.

use std::sync::Arc;

use ledger::{LedgerCore, MetricsRegistry};

/// Shared state held by the gateway and passed to request handlers via
/// Axum's `State` extractor.
pub struct AppState {
    pub core: Arc<LedgerCore>,
    pub metrics: Arc<MetricsRegistry>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
