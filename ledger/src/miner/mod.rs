//! Miner: seals pending entries into the next block.
//!
//! Builds a candidate on top of the tip, then hands it to the store for
//! validation and commit. The nonce search runs against a pluggable
//! `DifficultyCheck` policy rather than a fixed predicate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::chain::{ChainStore, DifficultyCheck};
use crate::error::ErrorKind;
use crate::pool::PendingPool;
use crate::types::{block_hash, Block, Entry, Hash256};

/// Difficulty policy for v1: a block hash is acceptable if it begins with
/// `leading_zero_hex_digits` hexadecimal zeros. Wrapped behind
/// [`DifficultyCheck`] so the chain store and miner share one predicate
/// without the miner depending on the chain's internals.
pub struct LeadingZerosDifficulty {
    leading_zero_hex_digits: usize,
}

impl LeadingZerosDifficulty {
    pub const DEFAULT_DIFFICULTY: usize = 2;

    pub fn new(leading_zero_hex_digits: usize) -> Self {
        Self {
            leading_zero_hex_digits,
        }
    }
}

impl Default for LeadingZerosDifficulty {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIFFICULTY)
    }
}

impl DifficultyCheck for LeadingZerosDifficulty {
    fn satisfies(&self, hash: &Hash256) -> bool {
        let hex = hash.to_hex();
        hex.as_bytes()
            .iter()
            .take(self.leading_zero_hex_digits)
            .all(|&b| b == b'0')
    }
}

/// Cooperative cancellation token checked between nonce attempts and
/// honored by callers that want to abort an in-flight `mine`.
#[derive(Clone, Default)]
pub struct CancellationToken(std::sync::Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How many nonce attempts to try before checking the cancellation token
/// and the wall-clock budget again. Keeps the hot loop tight while still
/// responding to cancellation promptly.
const CANCELLATION_CHECK_INTERVAL: u64 = 4096;

/// Seals pending entries into the next block.
pub struct Miner<'a> {
    pool: &'a PendingPool,
    chain: &'a ChainStore,
    difficulty: &'a dyn DifficultyCheck,
    mining_budget: Duration,
}

impl<'a> Miner<'a> {
    pub fn new(
        pool: &'a PendingPool,
        chain: &'a ChainStore,
        difficulty: &'a dyn DifficultyCheck,
        mining_budget: Duration,
    ) -> Self {
        Self {
            pool,
            chain,
            difficulty,
            mining_budget,
        }
    }

    /// Drains the pool, builds a candidate on top of the current tip,
    /// searches for a nonce satisfying the difficulty policy, and appends
    /// the result. On any failure the drained entries are returned to the
    /// head of the pool in their original order.
    pub fn mine(&self, cancel: &CancellationToken) -> Result<Block, ErrorKind> {
        let drained = self.pool.drain();
        if drained.is_empty() {
            return Err(ErrorKind::NothingToMine);
        }

        match self.seal(drained.clone(), cancel) {
            Ok(block) => match self.chain.append(block.clone()) {
                Ok(()) => Ok(block),
                Err(ErrorKind::ChainBroken { invariant: "index_sequence", .. })
                | Err(ErrorKind::ChainBroken { invariant: "previous_hash", .. }) => {
                    // Tip advanced under us between `seal` and `append`: a
                    // concurrent mine won this height first.
                    self.pool.return_to_head(drained);
                    Err(ErrorKind::StaleTip)
                }
                Err(err) => {
                    self.pool.return_to_head(drained);
                    Err(err)
                }
            },
            Err(err) => {
                self.pool.return_to_head(drained);
                Err(err)
            }
        }
    }

    fn seal(&self, entries: Vec<Entry>, cancel: &CancellationToken) -> Result<Block, ErrorKind> {
        let tip = self.chain.tip();
        let mut candidate = Block {
            index: tip.index + 1,
            timestamp: Utc::now(),
            entries,
            previous_hash: tip.hash,
            nonce: 0,
            hash: Hash256::ZERO,
        };

        let deadline = Instant::now() + self.mining_budget;
        loop {
            let hash = block_hash(&candidate);
            if self.difficulty.satisfies(&hash) {
                candidate.hash = hash;
                return Ok(candidate);
            }

            if candidate.nonce % CANCELLATION_CHECK_INTERVAL == 0 {
                if cancel.is_cancelled() {
                    return Err(ErrorKind::Cancelled);
                }
                if Instant::now() >= deadline {
                    return Err(ErrorKind::MiningBudgetExceeded);
                }
            }

            candidate.nonce = candidate.nonce.checked_add(1).ok_or(ErrorKind::MiningBudgetExceeded)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decision, Metadata, ValidationRecord};

    fn valid_entry(content: &str) -> Entry {
        Entry {
            content: content.to_string(),
            author: "alice".into(),
            intent: "test".into(),
            timestamp: Utc::now(),
            metadata: Metadata::new(),
            validation: ValidationRecord {
                decision: Decision::Valid,
                paraphrase: content.to_string(),
                reasoning: "ok".into(),
                validator_id: "heuristic".into(),
                model_version: "v1".into(),
            },
        }
    }

    struct AlwaysSatisfied;
    impl DifficultyCheck for AlwaysSatisfied {
        fn satisfies(&self, _hash: &Hash256) -> bool {
            true
        }
    }

    struct NeverSatisfied;
    impl DifficultyCheck for NeverSatisfied {
        fn satisfies(&self, _hash: &Hash256) -> bool {
            false
        }
    }

    #[test]
    fn mine_with_trivial_difficulty_seals_pending_entries() {
        let pool = PendingPool::new(crate::pool::DEFAULT_SOFT_CAP);
        let chain = ChainStore::new(Box::new(AlwaysSatisfied));
        pool.submit(valid_entry("first"), |h| chain.contains_entry_hash(h)).unwrap();

        let difficulty = AlwaysSatisfied;
        let miner = Miner::new(&pool, &chain, &difficulty, Duration::from_secs(5));
        let block = miner.mine(&CancellationToken::new()).unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(chain.tip().index, 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn mine_with_empty_pool_fails_with_nothing_to_mine() {
        let pool = PendingPool::new(crate::pool::DEFAULT_SOFT_CAP);
        let chain = ChainStore::new(Box::new(AlwaysSatisfied));
        let difficulty = AlwaysSatisfied;
        let miner = Miner::new(&pool, &chain, &difficulty, Duration::from_secs(5));

        let err = miner.mine(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ErrorKind::NothingToMine));
    }

    #[test]
    fn mine_returns_entries_to_pool_on_budget_exhaustion() {
        let pool = PendingPool::new(crate::pool::DEFAULT_SOFT_CAP);
        let chain = ChainStore::new(Box::new(NeverSatisfied));
        pool.submit(valid_entry("unsealable"), |h| chain.contains_entry_hash(h)).unwrap();

        let difficulty = NeverSatisfied;
        // Budget expires almost instantly; the nonce search can never
        // satisfy a predicate that is always false.
        let miner = Miner::new(&pool, &chain, &difficulty, Duration::from_millis(1));
        let err = miner.mine(&CancellationToken::new()).unwrap_err();

        assert!(matches!(err, ErrorKind::MiningBudgetExceeded));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.snapshot()[0].content, "unsealable");
    }

    #[test]
    fn mine_honors_pre_cancelled_token() {
        let pool = PendingPool::new(crate::pool::DEFAULT_SOFT_CAP);
        let chain = ChainStore::new(Box::new(NeverSatisfied));
        pool.submit(valid_entry("cancel me"), |h| chain.contains_entry_hash(h)).unwrap();

        let difficulty = NeverSatisfied;
        let miner = Miner::new(&pool, &chain, &difficulty, Duration::from_secs(5));
        let token = CancellationToken::new();
        token.cancel();

        let err = miner.mine(&token).unwrap_err();
        assert!(matches!(err, ErrorKind::Cancelled));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn concurrent_mine_calls_seal_each_entry_into_exactly_one_block() {
        let pool = PendingPool::new(crate::pool::DEFAULT_SOFT_CAP);
        let chain = ChainStore::new(Box::new(AlwaysSatisfied));
        let n = 8;
        for i in 0..n {
            pool.submit(valid_entry(&format!("entry-{i}")), |h| chain.contains_entry_hash(h)).unwrap();
        }

        let difficulty = AlwaysSatisfied;
        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..n)
                .map(|_| {
                    let pool = &pool;
                    let chain = &chain;
                    let difficulty = &difficulty;
                    scope.spawn(move || {
                        let miner = Miner::new(pool, chain, difficulty, Duration::from_secs(5));
                        miner.mine(&CancellationToken::new())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let sealed_indices: Vec<u64> = results.iter().filter_map(|r| r.as_ref().ok().map(|b| b.index)).collect();
        let mut sorted = sealed_indices.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), sealed_indices.len(), "no two mine calls sealed the same height");
        assert_eq!(chain.verify(), Ok(()));
        assert!(pool.is_empty());
        assert_eq!(chain.tip().index as usize, sealed_indices.len());
    }

    #[test]
    fn leading_zeros_difficulty_checks_hex_prefix() {
        let difficulty = LeadingZerosDifficulty::new(2);
        let matching = Hash256::compute(b"");
        // Find some input whose hash happens not to start with two zeros,
        // and one crafted hash that does, to exercise both branches.
        let mut zero_prefixed = [0u8; 32];
        zero_prefixed[0] = 0x00;
        assert!(difficulty.satisfies(&Hash256(zero_prefixed)));

        let mut non_zero_prefixed = [0u8; 32];
        non_zero_prefixed[0] = 0xFF;
        assert!(!difficulty.satisfies(&Hash256(non_zero_prefixed)));
        let _ = matching;
    }
}
