use serde::{Deserialize, Serialize};

use medcopilot_core::error::{Error, Result};
use medcopilot_core::types::{Chunk, Handle};

/// Handle → chunk text and provenance. Handles are assigned sequentially by
/// `append` and line up with vector index positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStore {
    chunks: Vec<Chunk>,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    pub fn append(&mut self, text: impl Into<String>, source_label: impl Into<String>) -> Handle {
        let handle = self.chunks.len();
        self.chunks.push(Chunk { handle, text: text.into(), source_label: source_label.into() });
        handle
    }

    pub fn get(&self, handle: Handle) -> Option<&Chunk> { self.chunks.get(handle) }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn chunks(&self) -> &[Chunk] { &self.chunks }

    /// Rebuild a store from persisted chunks, checking handles are dense.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self> {
        if let Some((i, c)) = chunks.iter().enumerate().find(|(i, c)| c.handle != *i) {
            return Err(Error::Persist(format!("chunk at position {i} carries handle {}", c.handle)));
        }
        Ok(Self { chunks })
    }
}
