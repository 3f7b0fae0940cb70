use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{CompletionRequest, QueryMode};

/// Maps text to fixed-dimension vectors.
///
/// Implementations must be deterministic for a fixed model version and
/// order-preserving: output `i` belongs to input `i`, independent of what
/// else is in the batch.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// A chat-completion style model endpoint.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;
}

/// Append-only query log. Failures are reported but never block a query.
pub trait AnalyticsSink: Send + Sync {
    fn record(&self, query: &str, mode: QueryMode) -> anyhow::Result<()>;
}
