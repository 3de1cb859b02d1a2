//! Top-level configuration for a ledger node.
//!
//! This module aggregates configuration for:
//!
//! - the semantic firewall (`SanitizerConfig`),
//! - the pending pool (`PoolConfig`),
//! - the miner (`MiningConfig`),
//! - the validator port (`ValidatorConfig`),
//! - the embedding index (`EmbeddingConfig`),
//! - and the metrics exporter (`MetricsConfig`).
//!
//! The goal is to have a single `LedgerConfig` struct that higher-level
//! binaries (e.g. `main.rs`) can construct from defaults, config files, or
//! environment variables as needed.

use std::net::SocketAddr;
use std::time::Duration;

use crate::miner::LeadingZerosDifficulty;
use crate::types::{MAX_AUTHOR_LEN, MAX_CONTENT_LEN, MAX_INTENT_LEN};

/// Configuration for the semantic firewall.
#[derive(Clone, Debug)]
pub struct SanitizerConfig {
    /// Hard cap on any single field's sanitized length, in bytes.
    pub max_len: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_len: MAX_CONTENT_LEN,
        }
    }
}

/// Bounds applied to caller-supplied fields before sanitization.
#[derive(Clone, Debug)]
pub struct EntryLimits {
    pub max_content_len: usize,
    pub max_author_len: usize,
    pub max_intent_len: usize,
}

impl Default for EntryLimits {
    fn default() -> Self {
        Self {
            max_content_len: MAX_CONTENT_LEN,
            max_author_len: MAX_AUTHOR_LEN,
            max_intent_len: MAX_INTENT_LEN,
        }
    }
}

/// Configuration for the pending pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Soft cap above which submission fails with `PendingFull`.
    pub soft_cap: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            soft_cap: crate::pool::DEFAULT_SOFT_CAP,
        }
    }
}

/// Configuration for the miner: difficulty policy and mining budget.
#[derive(Clone, Debug)]
pub struct MiningConfig {
    /// Leading hex zeros a sealed block's hash must have.
    pub leading_zero_hex_digits: usize,
    /// Wall-clock budget a single `mine` call is allowed before failing
    /// with `MiningBudgetExceeded`.
    pub budget: Duration,
}

impl MiningConfig {
    pub fn difficulty(&self) -> LeadingZerosDifficulty {
        LeadingZerosDifficulty::new(self.leading_zero_hex_digits)
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            leading_zero_hex_digits: LeadingZerosDifficulty::DEFAULT_DIFFICULTY,
            budget: Duration::from_secs(30),
        }
    }
}

/// Which [`crate::validator::ValidatorPort`] implementation a node wires
/// up. The HTTP and quorum variants need a base URL; the heuristic variant
/// needs none.
#[derive(Clone, Debug)]
pub enum ValidatorConfig {
    Heuristic,
    Http {
        base_url: String,
        timeout: Duration,
        max_retries: u32,
        backoff_base: Duration,
    },
    Quorum {
        members: Vec<String>,
        timeout: Duration,
        max_retries: u32,
        backoff_base: Duration,
    },
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig::Heuristic
    }
}

/// Configuration for the embedding index.
#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    /// Fixed vector dimension the index was built for.
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a ledger node.
///
/// This aggregates all the sub-configs needed to wire up a typical node:
/// the semantic firewall, entry limits, pending pool, miner, validator
/// port, embedding index, and Prometheus metrics exporter.
#[derive(Clone, Debug, Default)]
pub struct LedgerConfig {
    pub sanitizer: SanitizerConfig,
    pub entry_limits: EntryLimits,
    pub pool: PoolConfig,
    pub mining: MiningConfig,
    pub validator: ValidatorConfig,
    pub embedding: EmbeddingConfig,
    pub metrics: MetricsConfig,
}
