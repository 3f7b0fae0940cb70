//! Ingestion and retrieval: documents → chunks → vectors → snapshot, and
//! query → nearest chunks → bounded context.
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use medcopilot_core::chunker::truncate_chars;
use medcopilot_core::config::{ChunkingSettings, Settings};
use medcopilot_core::documents::{DocumentOutcome, DocumentProcessor};
use medcopilot_core::error::{Error, Result};
use medcopilot_core::traits::Embedder;
use medcopilot_core::types::RawDocument;
use medcopilot_vector::{CorpusSnapshot, DocumentStore, FlatL2Index, RetrievedChunk};

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub filename: String,
    pub reason: String,
}

/// What a rebuild did, including every document it could not use.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RebuildReport {
    pub documents: usize,
    pub pages: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedDocument>,
    /// Set when the rebuild itself failed; the previous corpus stays in place.
    pub failure: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct RebuildOutcome {
    /// `None` means the corpus is EMPTY (or the rebuild failed, see `report.failure`).
    pub snapshot: Option<CorpusSnapshot>,
    pub report: RebuildReport,
}

pub struct RetrievalPipeline {
    embedder: Arc<dyn Embedder>,
    processor: DocumentProcessor,
    max_context_chars: usize,
}

impl RetrievalPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, settings: &Settings) -> Self {
        Self::with_chunking(embedder, settings.chunking.clone(), settings.retrieval.max_context_chars)
    }

    pub fn with_chunking(embedder: Arc<dyn Embedder>, chunking: ChunkingSettings, max_context_chars: usize) -> Self {
        Self { embedder, processor: DocumentProcessor::new(chunking), max_context_chars }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    /// Full, non-incremental rebuild. Every surviving chunk is embedded in a
    /// single batch and a fresh index is built off to the side.
    pub fn rebuild(&self, documents: &[RawDocument]) -> Result<RebuildOutcome> {
        let start = Instant::now();
        let mut report = RebuildReport { documents: documents.len(), ..RebuildReport::default() };
        let mut drafts = Vec::new();
        for outcome in self.processor.process_all(documents) {
            match outcome {
                DocumentOutcome::Parsed { pages, chunks, .. } => {
                    report.pages += pages;
                    drafts.extend(chunks);
                }
                DocumentOutcome::Skipped { filename, reason } => {
                    report.skipped.push(SkippedDocument { filename, reason });
                }
            }
        }
        if drafts.is_empty() {
            report.elapsed_ms = start.elapsed().as_millis() as u64;
            info!(documents = report.documents, skipped = report.skipped.len(), "rebuild produced no chunks, corpus is empty");
            return Ok(RebuildOutcome { snapshot: None, report });
        }

        let texts: Vec<String> = drafts.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).map_err(|e| Error::Embedding(format!("{e:#}")))?;
        if vectors.len() != texts.len() {
            return Err(Error::Embedding(format!("embedder returned {} vectors for {} chunks", vectors.len(), texts.len())));
        }

        let index = FlatL2Index::build(&vectors)?;
        let mut store = DocumentStore::new();
        for draft in drafts {
            store.append(draft.text, draft.source_label);
        }
        let snapshot = CorpusSnapshot::new(store, index)?;
        report.chunks = snapshot.len();
        report.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            documents = report.documents,
            pages = report.pages,
            chunks = report.chunks,
            skipped = report.skipped.len(),
            elapsed_ms = report.elapsed_ms,
            "corpus rebuilt"
        );
        Ok(RebuildOutcome { snapshot: Some(snapshot), report })
    }

    /// Like [`rebuild`](Self::rebuild) but failures land in the report.
    pub fn rebuild_reported(&self, documents: &[RawDocument]) -> RebuildOutcome {
        match self.rebuild(documents) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "rebuild failed, keeping previous corpus");
                let report = RebuildReport { documents: documents.len(), failure: Some(e.to_string()), ..RebuildReport::default() };
                RebuildOutcome { snapshot: None, report }
            }
        }
    }

    /// The `k` chunks nearest to `text`, closest first. An empty snapshot
    /// yields an empty result, not an error.
    pub fn query(&self, snapshot: &CorpusSnapshot, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if snapshot.is_empty() { return Ok(Vec::new()); }
        let query_vec = self
            .embedder
            .embed_batch(&[text.to_string()])
            .map_err(|e| Error::Embedding(format!("{e:#}")))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("embedder returned no vector for the query".into()))?;
        snapshot.nearest(&query_vec, k)
    }

    pub fn assemble_context(&self, chunks: &[RetrievedChunk]) -> String {
        assemble_context(chunks, self.max_context_chars)
    }
}

/// Join chunk texts with [`CONTEXT_SEPARATOR`] and cut to `max_chars`.
pub fn assemble_context(chunks: &[RetrievedChunk], max_chars: usize) -> String {
    let joined = chunks.iter().map(|c| c.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
    truncate_chars(&joined, max_chars).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use medcopilot_core::types::Chunk;

    fn retrieved(text: &str) -> RetrievedChunk {
        RetrievedChunk { chunk: Chunk { handle: 0, text: text.into(), source_label: "x — Page 1".into() }, distance: 0.0 }
    }

    #[test]
    fn context_is_joined_and_truncated() {
        let chunks = vec![retrieved("alpha"), retrieved("beta")];
        assert_eq!(assemble_context(&chunks, 1000), "alpha\n\n---\n\nbeta");
        assert_eq!(assemble_context(&chunks, 7), "alpha\n\n");
        assert_eq!(assemble_context(&[], 10), "");
    }
}
