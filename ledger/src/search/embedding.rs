//! Embedding index: a vector index over entries for semantic search and
//! duplicate detection.
//!
//! An `Arc`-shared struct behind a lock, mutated from multiple call sites
//! and read without blocking writers for long. A dimension mismatch or a
//! missing vector degrades to lexical search, never panics.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ErrorKind;
use crate::types::EntryRef;

/// Abstract embedding provider. The dimension is fixed at the provider's
/// construction; rebuilding the index is the only way to change it.
pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;
    fn embed(&self, sanitized_text: &str) -> Result<Vec<f32>, ErrorKind>;
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    // Both vectors are stored pre-normalized, so cosine similarity is
    // just the dot product; still guard against a degenerate (all-zero)
    // stored vector rather than ever dividing by zero.
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot as f64
}

struct Inner {
    dimension: usize,
    vectors: HashMap<EntryRef, Vec<f32>>,
    generation: u64,
    stale: bool,
}

/// Vector index keyed by [`EntryRef`]. A derivative of the chain: it is
/// fully reconstructable via [`EmbeddingIndex::rebuild_from_chain`] and
/// must never be treated as the source of truth.
pub struct EmbeddingIndex {
    inner: Mutex<Inner>,
}

impl EmbeddingIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                dimension,
                vectors: HashMap::new(),
                generation: 0,
                stale: false,
            }),
        }
    }

    /// Inserts or replaces the vector for `entry_ref`. Rejects vectors of
    /// the wrong dimension rather than silently truncating or padding them.
    pub fn index(&self, entry_ref: EntryRef, mut vector: Vec<f32>) -> Result<(), ErrorKind> {
        let mut inner = self.inner.lock().expect("embedding index mutex poisoned");
        if vector.len() != inner.dimension {
            return Err(ErrorKind::BadInput(format!(
                "embedding has dimension {}, index expects {}",
                vector.len(),
                inner.dimension
            )));
        }
        l2_normalize(&mut vector);
        inner.vectors.insert(entry_ref, vector);
        inner.generation += 1;
        Ok(())
    }

    /// Returns up to `limit` entries most similar to `vector`, in
    /// descending cosine-similarity order. Tolerates a one-generation lag;
    /// callers observing [`EmbeddingIndex::is_stale`] should prefer
    /// lexical search instead of calling this.
    pub fn query(&self, mut vector: Vec<f32>, limit: usize) -> Result<Vec<(EntryRef, f64)>, ErrorKind> {
        let inner = self.inner.lock().expect("embedding index mutex poisoned");
        if vector.len() != inner.dimension {
            return Err(ErrorKind::BadInput(format!(
                "query vector has dimension {}, index expects {}",
                vector.len(),
                inner.dimension
            )));
        }
        l2_normalize(&mut vector);

        let mut scored: Vec<(EntryRef, f64)> = inner
            .vectors
            .iter()
            .map(|(r, v)| (*r, cosine_similarity(&vector, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    /// Returns a clone of the stored (already L2-normalized) vector for
    /// `entry_ref`, if one has been indexed.
    pub fn vector_for(&self, entry_ref: &EntryRef) -> Option<Vec<f32>> {
        self.inner
            .lock()
            .expect("embedding index mutex poisoned")
            .vectors
            .get(entry_ref)
            .cloned()
    }

    /// Cosine similarity between two already-normalized vectors, exposed
    /// so callers that hold two specific stored vectors (rather than
    /// running a ranked `query`) can still score them directly.
    pub fn similarity(a: &[f32], b: &[f32]) -> f64 {
        cosine_similarity(a, b)
    }

    /// Current generation counter, bumped on every `index` call.
    pub fn generation(&self) -> u64 {
        self.inner.lock().expect("embedding index mutex poisoned").generation
    }

    /// True if the index has been explicitly flagged stale (e.g. an
    /// embedding-provider failure during a rebuild). A stale index
    /// degrades semantic search to lexical search with a warning; it
    /// never blocks chain writes.
    pub fn is_stale(&self) -> bool {
        self.inner.lock().expect("embedding index mutex poisoned").stale
    }

    pub fn mark_stale(&self) {
        self.inner.lock().expect("embedding index mutex poisoned").stale = true;
    }

    /// Rebuilds the index from `entries`, embedding each with `provider`.
    /// A single embedding failure flags the index stale and stops the
    /// rebuild rather than leaving a half-populated index masquerading as
    /// fresh; entries processed before the failure keep their vectors.
    pub fn rebuild_from_chain(
        &self,
        entries: &[(EntryRef, String)],
        provider: &dyn EmbeddingProvider,
    ) {
        for (entry_ref, sanitized_text) in entries {
            match provider.embed(sanitized_text) {
                Ok(vector) => {
                    if self.index(*entry_ref, vector).is_err() {
                        self.mark_stale();
                        return;
                    }
                }
                Err(_) => {
                    self.mark_stale();
                    return;
                }
            }
        }
        let mut inner = self.inner.lock().expect("embedding index mutex poisoned");
        inner.stale = false;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("embedding index mutex poisoned").vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
