//! Block types.
//!
//! Entries replace transactions, and the hash chain links through an
//! explicit monotonic `index` rather than a fork-choice-selected parent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::Entry;
use super::hash::Hash256;

/// An ordered sealed batch of entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Monotonically increasing non-negative index; block `i` follows `i-1`.
    pub index: u64,
    /// Sealing time.
    pub timestamp: DateTime<Utc>,
    /// Ordered, non-empty sequence of entries (genesis excepted: exactly one).
    pub entries: Vec<Entry>,
    /// Hash of the block at `index - 1`; all-zero for genesis.
    pub previous_hash: Hash256,
    /// Nonce chosen during sealing so that `hash` satisfies the difficulty policy.
    pub nonce: u64,
    /// SHA-256 over the canonical bytes of (index, timestamp, entries, previous_hash, nonce).
    pub hash: Hash256,
}

impl Block {
    /// Returns the author identity used for the genesis entry.
    pub const GENESIS_AUTHOR: &'static str = "system";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::entry::{Decision, Metadata, ValidationRecord};

    fn dummy_entry(content: &str) -> Entry {
        Entry {
            content: content.to_string(),
            author: "alice".into(),
            intent: "test".into(),
            timestamp: Utc::now(),
            metadata: Metadata::new(),
            validation: ValidationRecord {
                decision: Decision::Valid,
                paraphrase: content.to_string(),
                reasoning: "heuristic pass".into(),
                validator_id: "heuristic".into(),
                model_version: "v0".into(),
            },
        }
    }

    #[test]
    fn block_carries_its_entries_in_order() {
        let block = Block {
            index: 1,
            timestamp: Utc::now(),
            entries: vec![dummy_entry("first"), dummy_entry("second")],
            previous_hash: Hash256::ZERO,
            nonce: 0,
            hash: Hash256::ZERO,
        };
        assert_eq!(block.entries[0].content, "first");
        assert_eq!(block.entries[1].content, "second");
    }
}
