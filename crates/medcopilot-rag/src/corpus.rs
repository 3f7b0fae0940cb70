use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use medcopilot_vector::CorpusSnapshot;

use crate::pipeline::{RebuildOutcome, RebuildReport};

/// The currently served corpus.
///
/// Readers clone the `Arc` and keep querying it even while a rebuild swaps
/// in a successor, so a query never sees a half-built index.
#[derive(Debug, Default)]
pub struct CorpusHandle {
    current: RwLock<Option<Arc<CorpusSnapshot>>>,
}

impl CorpusHandle {
    pub fn new() -> Self { Self::default() }

    pub fn with_snapshot(snapshot: Option<CorpusSnapshot>) -> Self {
        Self { current: RwLock::new(snapshot.map(Arc::new)) }
    }

    pub fn current(&self) -> Option<Arc<CorpusSnapshot>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the served snapshot, returning the previous one.
    pub fn install(&self, snapshot: CorpusSnapshot) -> Option<Arc<CorpusSnapshot>> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        info!(chunks = snapshot.len(), fingerprint = %snapshot.fingerprint(), "serving new corpus snapshot");
        guard.replace(Arc::new(snapshot))
    }

    pub fn clear(&self) -> Option<Arc<CorpusSnapshot>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Apply a rebuild result: a new snapshot is installed, an empty rebuild
    /// clears the corpus, and a failed one leaves it untouched.
    pub fn apply(&self, outcome: RebuildOutcome) -> RebuildReport {
        match (outcome.snapshot, outcome.report.failure.is_some()) {
            (Some(snapshot), _) => { self.install(snapshot); }
            (None, false) => { self.clear(); }
            (None, true) => {}
        }
        outcome.report
    }

    pub fn chunk_count(&self) -> usize { self.current().map_or(0, |s| s.len()) }
}
