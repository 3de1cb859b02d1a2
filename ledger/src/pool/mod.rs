//! Pending pool: a FIFO of validated entries awaiting a block.
//!
//! A `VecDeque` behind a single mutex, pushed from handlers and drained
//! by the mining loop. Synchronous (`std::sync::Mutex`) rather than
//! `tokio::sync::Mutex` since the core is not async: only the external
//! HTTP adapter runs on a Tokio runtime.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::error::ErrorKind;
use crate::types::{entry_hash, Decision, Entry, Hash256};

/// Soft cap policy: above this count, `submit` fails with
/// [`ErrorKind::PendingFull`]; the pool never evicts on its own.
pub const DEFAULT_SOFT_CAP: usize = 10_000;

struct Inner {
    queue: VecDeque<Entry>,
    /// Content hashes of everything currently queued, for O(1) dedup
    /// lookups without re-hashing the whole queue on every submit.
    queued_hashes: HashSet<Hash256>,
}

/// Concurrent staging area for validated entries not yet sealed into a
/// block. Exactly one writer at a time; any number of readers may call
/// [`PendingPool::snapshot`] concurrently with a writer without blocking.
pub struct PendingPool {
    inner: Mutex<Inner>,
    soft_cap: usize,
}

impl PendingPool {
    pub fn new(soft_cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                queued_hashes: HashSet::new(),
            }),
            soft_cap,
        }
    }

    /// Appends `entry` if it is VALID, not a duplicate against
    /// `chain_hashes ∪ pool`, and the pool has not exceeded its soft cap.
    ///
    /// `chain_hashes` is a callback rather than a borrowed set so that the
    /// chain store's own lock is taken and released outside of the pool's
    /// lock, avoiding a fixed-order-violating double lock: the miner is
    /// the only code path that legitimately holds both, in pool order
    /// then chain order.
    pub fn submit(
        &self,
        entry: Entry,
        is_duplicate_in_chain: impl FnOnce(&Hash256) -> bool,
    ) -> Result<(), ErrorKind> {
        if entry.validation.decision != Decision::Valid {
            return Err(ErrorKind::ValidatorRejected(entry.validation.decision.to_string()));
        }

        let hash = entry_hash(&entry);
        let mut inner = self.inner.lock().expect("pending pool mutex poisoned");

        if inner.queued_hashes.contains(&hash) || is_duplicate_in_chain(&hash) {
            return Err(ErrorKind::Duplicate);
        }

        if inner.queue.len() >= self.soft_cap {
            return Err(ErrorKind::PendingFull);
        }

        inner.queued_hashes.insert(hash);
        inner.queue.push_back(entry);
        Ok(())
    }

    /// Copy-on-read snapshot in FIFO order.
    pub fn snapshot(&self) -> Vec<Entry> {
        let inner = self.inner.lock().expect("pending pool mutex poisoned");
        inner.queue.iter().cloned().collect()
    }

    /// Removes and returns all entries, atomic with respect to concurrent
    /// `submit` calls.
    pub fn drain(&self) -> Vec<Entry> {
        let mut inner = self.inner.lock().expect("pending pool mutex poisoned");
        inner.queued_hashes.clear();
        inner.queue.drain(..).collect()
    }

    /// Returns `entries` to the head of the pool, preserving their
    /// original relative order. Used when a mine attempt fails after
    /// draining.
    pub fn return_to_head(&self, entries: Vec<Entry>) {
        if entries.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().expect("pending pool mutex poisoned");
        for entry in entries.into_iter().rev() {
            inner.queued_hashes.insert(entry_hash(&entry));
            inner.queue.push_front(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("pending pool mutex poisoned").queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
