//! Chain store: the append-only, index-ordered, hash-linked sequence of
//! blocks.
//!
//! This chain is a strict sequence by construction (`block[i]` always
//! follows `block[i-1]`) rather than a hash-keyed DAG resolved by a
//! fork-choice rule, so there is no fork-choice component here.

use std::sync::Mutex;

use chrono::Utc;

use crate::error::{ErrorKind, Invariant};
use crate::types::{
    block_hash, entry_hash, Block, Decision, Entry, Hash256, Metadata, ValidationRecord,
};

/// Predicate a sealed block's hash must satisfy. v1's concrete policy is
/// "K leading hex zeros" (see `crate::miner::DifficultyPolicy`); the
/// chain store only needs to re-check the predicate, not choose it.
pub trait DifficultyCheck: Send + Sync {
    fn satisfies(&self, hash: &Hash256) -> bool;
}

/// System author used for the genesis entry.
pub const GENESIS_AUTHOR: &str = "system";

/// Builds the genesis block: a single system-authored entry describing
/// the chain's purpose, sealed with nonce 0 against an all-zero parent.
///
/// Genesis is exempt from the active difficulty policy (there is no
/// miner involved in its construction); [`ChainStore::new`] seals it
/// directly rather than routing it through [`ChainStore::append`].
pub fn genesis_block() -> Block {
    let entry = Entry {
        content: "Genesis entry: append-only ledger of validated natural-language statements."
            .to_string(),
        author: GENESIS_AUTHOR.to_string(),
        intent: "chain initialization".to_string(),
        timestamp: Utc::now(),
        metadata: Metadata::new(),
        validation: ValidationRecord {
            decision: Decision::Valid,
            paraphrase: "genesis".to_string(),
            reasoning: "system-sealed, not subject to validator review".to_string(),
            validator_id: "system".to_string(),
            model_version: "n/a".to_string(),
        },
    };

    let mut block = Block {
        index: 0,
        timestamp: entry.timestamp,
        entries: vec![entry],
        previous_hash: Hash256::ZERO,
        nonce: 0,
        hash: Hash256::ZERO,
    };
    block.hash = block_hash(&block);
    block
}

struct Inner {
    blocks: Vec<Block>,
    /// Content hashes of every entry ever sealed, mirrored here so the
    /// pending pool's dedup check does not need to scan every block.
    sealed_hashes: std::collections::HashSet<Hash256>,
}

/// Append-only chain of blocks with full invariant checking on every
/// write. One writer at a time; readers see immutable references to
/// sealed blocks and never block behind a writer.
pub struct ChainStore {
    inner: Mutex<Inner>,
    difficulty: Box<dyn DifficultyCheck>,
}

impl ChainStore {
    /// Initializes a fresh chain with only the genesis block.
    pub fn new(difficulty: Box<dyn DifficultyCheck>) -> Self {
        let genesis = genesis_block();
        let mut sealed_hashes = std::collections::HashSet::new();
        for entry in &genesis.entries {
            sealed_hashes.insert(entry_hash(entry));
        }
        Self {
            inner: Mutex::new(Inner {
                blocks: vec![genesis],
                sealed_hashes,
            }),
            difficulty,
        }
    }

    /// Validates `block` against every invariant relative to the current
    /// tip, then commits it atomically. Either the tip advances or
    /// nothing about the store's observable state changes.
    pub fn append(&self, block: Block) -> Result<(), ErrorKind> {
        let mut inner = self.inner.lock().expect("chain store mutex poisoned");

        let tip = inner.blocks.last().expect("chain always has at least genesis");

        check_invariant(block.index == tip.index + 1, block.index, "index_sequence")?;
        check_invariant(
            block.previous_hash.as_bytes() == tip.hash.as_bytes(),
            block.index,
            "previous_hash",
        )?;
        check_invariant(!block.entries.is_empty(), block.index, "non_empty_entries")?;
        let recomputed = block_hash(&block);
        check_invariant(recomputed.as_bytes() == block.hash.as_bytes(), block.index, "hash_matches_bytes")?;
        check_invariant(self.difficulty.satisfies(&block.hash), block.index, "difficulty_satisfied")?;

        for entry in &block.entries {
            let h = entry_hash(entry);
            inner.sealed_hashes.insert(h);
        }
        inner.blocks.push(block);
        Ok(())
    }

    /// Returns the current tip (highest-index block).
    pub fn tip(&self) -> Block {
        let inner = self.inner.lock().expect("chain store mutex poisoned");
        inner.blocks.last().expect("chain always has at least genesis").clone()
    }

    pub fn get(&self, index: u64) -> Option<Block> {
        let inner = self.inner.lock().expect("chain store mutex poisoned");
        inner.blocks.get(index as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("chain store mutex poisoned").blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        false // genesis always present
    }

    /// Exposes the active difficulty predicate so the miner can share it
    /// without the chain store needing to know anything about mining.
    pub fn difficulty(&self) -> &dyn DifficultyCheck {
        self.difficulty.as_ref()
    }

    /// Immutable snapshot of every sealed block, in index order.
    pub fn snapshot(&self) -> Vec<Block> {
        self.inner.lock().expect("chain store mutex poisoned").blocks.clone()
    }

    /// True if `hash` belongs to any entry ever sealed into the chain.
    pub fn contains_entry_hash(&self, hash: &Hash256) -> bool {
        self.inner
            .lock()
            .expect("chain store mutex poisoned")
            .sealed_hashes
            .contains(hash)
    }

    /// Re-checks every invariant end-to-end, returning the first
    /// violation found.
    pub fn verify(&self) -> Result<(), (u64, Invariant)> {
        let inner = self.inner.lock().expect("chain store mutex poisoned");
        for (i, block) in inner.blocks.iter().enumerate() {
            let i = i as u64;
            if block.index != i {
                return Err((i, "index_sequence"));
            }
            if i == 0 {
                if block.previous_hash.as_bytes() != Hash256::ZERO.as_bytes() {
                    return Err((i, "genesis_previous_hash"));
                }
            } else {
                let parent = &inner.blocks[(i - 1) as usize];
                if block.previous_hash.as_bytes() != parent.hash.as_bytes() {
                    return Err((i, "previous_hash"));
                }
            }
            if block_hash(block).as_bytes() != block.hash.as_bytes() {
                return Err((i, "hash_matches_bytes"));
            }
            if i > 0 && !self.difficulty.satisfies(&block.hash) {
                return Err((i, "difficulty_satisfied"));
            }
        }
        Ok(())
    }
}

fn check_invariant(ok: bool, index: u64, invariant: Invariant) -> Result<(), ErrorKind> {
    if ok {
        Ok(())
    } else {
        Err(ErrorKind::ChainBroken { index, invariant })
    }
}
