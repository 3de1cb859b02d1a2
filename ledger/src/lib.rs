//! Ledger library crate.
//!
//! This crate provides the core building blocks for an append-only ledger
//! of validated natural-language statements:
//!
//! - strongly-typed domain types and canonical byte encoding (`types`),
//! - a unified error taxonomy (`error`),
//! - a semantic firewall (`sanitizer`),
//! - a pluggable admission-decision surface (`validator`),
//! - a concurrent pending pool (`pool`),
//! - a hash-chained, index-ordered chain store (`chain`),
//! - a proof-of-work-style miner (`miner`),
//! - a best-effort contract sub-protocol (`contract`),
//! - lexical and semantic search (`search`),
//! - a semantic drift detector (`drift`),
//! - core dispatch wiring every component together (`dispatch`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries (this crate's `main.rs`, and the `ledger-gateway`
//! HTTP adapter) compose these pieces into a running node.

pub mod chain;
pub mod config;
pub mod contract;
pub mod dispatch;
pub mod drift;
pub mod error;
pub mod metrics;
pub mod miner;
pub mod pool;
pub mod sanitizer;
pub mod search;
pub mod types;
pub mod validator;

pub use config::LedgerConfig;
pub use dispatch::{ChainInfo, EntrySubmission, LedgerCore, RequestContext};
pub use error::{ErrorKind, Invariant};
pub use metrics::{LedgerMetrics, MetricsRegistry, run_prometheus_http_server};
pub use miner::{CancellationToken, LeadingZerosDifficulty};

// Re-export domain types at the crate root for convenience.
pub use types::*;
