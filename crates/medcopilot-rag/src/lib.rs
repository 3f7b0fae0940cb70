//! Retrieval-augmented answering over the hospital evidence corpus.

pub mod analytics;
pub mod backend;
pub mod corpus;
pub mod engine;
pub mod pipeline;
pub mod scorer;
pub mod synth;

pub use analytics::{summarize, AnalyticsSummary, JsonlAnalyticsSink, NoopSink};
pub use backend::ChatCompletionsBackend;
pub use corpus::CorpusHandle;
pub use engine::QueryEngine;
pub use pipeline::{assemble_context, RebuildOutcome, RebuildReport, RetrievalPipeline, SkippedDocument};
pub use scorer::{confidence, cosine, EvidenceScore, EvidenceScorer};
pub use synth::{AnswerSynthesizer, SynthesisOutcome};
