//! Immutable pairing of a vector index with its document store.
use medcopilot_core::error::{Error, Result};
use medcopilot_core::types::{Chunk, Handle};

use crate::index::FlatL2Index;
use crate::store::DocumentStore;

/// A chunk returned by a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

/// One corpus generation: `store.get(i)` pairs with `index.vector(i)`.
///
/// Snapshots are never mutated after construction; a rebuild produces a new
/// one. `fingerprint` is the blake3 digest of the serialized index and ties
/// the two persisted artifacts together.
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    store: DocumentStore,
    index: FlatL2Index,
    fingerprint: String,
}

impl CorpusSnapshot {
    pub fn new(store: DocumentStore, index: FlatL2Index) -> Result<Self> {
        let fingerprint = blake3::hash(&index.to_bytes()).to_hex().to_string();
        Self::with_fingerprint(store, index, fingerprint)
    }

    pub(crate) fn with_fingerprint(store: DocumentStore, index: FlatL2Index, fingerprint: String) -> Result<Self> {
        if store.len() != index.len() {
            return Err(Error::Persist(format!(
                "store holds {} chunks but index holds {} vectors",
                store.len(),
                index.len()
            )));
        }
        Ok(Self { store, index, fingerprint })
    }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }

    pub fn store(&self) -> &DocumentStore { &self.store }

    pub fn index(&self) -> &FlatL2Index { &self.index }

    pub fn fingerprint(&self) -> &str { &self.fingerprint }

    pub fn chunk(&self, handle: Handle) -> Option<&Chunk> { self.store.get(handle) }

    /// Nearest chunks to `query_vec`, closest first.
    pub fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        self.index
            .search(query_vec, k)?
            .into_iter()
            .map(|hit| {
                let chunk = self
                    .store
                    .get(hit.handle)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(format!("chunk handle {}", hit.handle)))?;
                Ok(RetrievedChunk { chunk, distance: hit.distance })
            })
            .collect()
    }
}
