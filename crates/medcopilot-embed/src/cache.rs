//! Bounded embedding cache keyed by `blake3(content)`.
//!
//! The cache is consulted before the wrapped provider and written through on
//! misses. Rebuilds re-embed the whole corpus, so unchanged chunks come back
//! from here instead of the model. Once `capacity` vectors are held the least
//! recently used one is evicted, so one-off queries and answers cannot grow
//! it without limit.
use anyhow::{anyhow, Result};
use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::debug;

use medcopilot_core::traits::Embedder;

pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    entries: Mutex<LruCache<blake3::Hash, Vec<f32>>>,
}

impl CachedEmbedder {
    /// A `capacity` of 0 is treated as 1.
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { inner, entries: Mutex::new(LruCache::new(cap)) }
    }

    pub fn len(&self) -> usize { self.entries.lock().map(|m| m.len()).unwrap_or(0) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn capacity(&self) -> usize { self.entries.lock().map(|m| m.cap().get()).unwrap_or(0) }
}

impl Embedder for CachedEmbedder {
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let hashes: Vec<blake3::Hash> = texts.iter().map(|t| blake3::hash(t.as_bytes())).collect();

        // Hits are copied out up front; inserting this batch's misses may evict them.
        let mut found: HashMap<blake3::Hash, Vec<f32>> = HashMap::new();
        let mut misses: Vec<String> = Vec::new();
        let mut miss_hashes: Vec<blake3::Hash> = Vec::new();
        let mut pending: HashSet<blake3::Hash> = HashSet::new();
        {
            let mut entries = self.entries.lock().map_err(|_| anyhow!("embedding cache lock poisoned"))?;
            for (text, h) in texts.iter().zip(&hashes) {
                if found.contains_key(h) || pending.contains(h) { continue; }
                match entries.get(h) {
                    Some(v) => { found.insert(*h, v.clone()); }
                    None => {
                        pending.insert(*h);
                        misses.push(text.clone());
                        miss_hashes.push(*h);
                    }
                }
            }
        }
        debug!(hits = found.len(), misses = misses.len(), "embedding cache lookup");

        if !misses.is_empty() {
            let fresh = self.inner.embed_batch(&misses)?;
            if fresh.len() != misses.len() {
                return Err(anyhow!("embedder returned {} vectors for {} texts", fresh.len(), misses.len()));
            }
            let mut entries = self.entries.lock().map_err(|_| anyhow!("embedding cache lock poisoned"))?;
            for (h, v) in miss_hashes.into_iter().zip(fresh) {
                entries.put(h, v.clone());
                found.insert(h, v);
            }
        }
        hashes
            .iter()
            .map(|h| found.get(h).cloned().ok_or_else(|| anyhow!("embedding cache lost entry {h}")))
            .collect()
    }
}
