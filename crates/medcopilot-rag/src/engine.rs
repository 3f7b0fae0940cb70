//! Query orchestration across the HOSPITAL, GLOBAL and HYBRID modes.
//!
//! `run_query` never fails: backend, configuration and evidence problems
//! are reported through each result's `status` alongside a readable answer.
use std::sync::Arc;
use tracing::{info, warn};

use medcopilot_core::config::{expand_path, Settings};
use medcopilot_core::error::Error;
use medcopilot_core::traits::{AnalyticsSink, Embedder, GenerativeBackend};
use medcopilot_core::types::{AnswerOrigin, EvidenceLevel, QueryMode, QueryResponse, QueryResult, QueryStatus, RawDocument};
use medcopilot_vector::{CorpusSnapshot, RetrievedChunk};

use crate::analytics::{JsonlAnalyticsSink, NoopSink};
use crate::backend::ChatCompletionsBackend;
use crate::pipeline::{RebuildOutcome, RetrievalPipeline};
use crate::scorer::{confidence, EvidenceScore, EvidenceScorer};
use crate::synth::{AnswerSynthesizer, INSUFFICIENT_EVIDENCE};

const NO_CORPUS_ANSWER: &str = "No hospital evidence has been indexed yet. Upload documents and rebuild the corpus.";
const RETRIEVAL_FAILED_ANSWER: &str = "Hospital evidence could not be searched";

pub struct QueryEngine {
    pipeline: RetrievalPipeline,
    scorer: EvidenceScorer,
    /// `Err` holds the reason the backend could not be configured.
    synthesizer: Result<AnswerSynthesizer, String>,
    analytics: Arc<dyn AnalyticsSink>,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(
        pipeline: RetrievalPipeline,
        scorer: EvidenceScorer,
        synthesizer: Result<AnswerSynthesizer, Error>,
        analytics: Arc<dyn AnalyticsSink>,
        top_k: usize,
    ) -> Self {
        Self { pipeline, scorer, synthesizer: synthesizer.map_err(|e| e.to_string()), analytics, top_k }
    }

    /// Wire everything from settings. A missing API key does not fail
    /// construction; it shows up as `ConfigurationError` on every query that
    /// needs the backend.
    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Self {
        let synthesizer = ChatCompletionsBackend::from_settings(&settings.backend).map(|backend| {
            let backend: Arc<dyn GenerativeBackend> = Arc::new(backend);
            AnswerSynthesizer::new(backend, settings.synthesis.clone())
        });
        if let Err(e) = &synthesizer {
            warn!(error = %e, "generative backend unavailable");
        }
        let analytics: Arc<dyn AnalyticsSink> = if settings.analytics.enabled {
            Arc::new(JsonlAnalyticsSink::new(expand_path(&settings.analytics.path)))
        } else {
            Arc::new(NoopSink)
        };
        Self::new(
            RetrievalPipeline::new(embedder.clone(), settings),
            EvidenceScorer::new(embedder, settings.scoring.clone()),
            synthesizer,
            analytics,
            settings.retrieval.top_k,
        )
    }

    pub fn pipeline(&self) -> &RetrievalPipeline { &self.pipeline }

    /// Full rebuild from raw documents. Failures are in `report.failure`.
    pub fn rebuild_corpus(&self, documents: &[RawDocument]) -> RebuildOutcome {
        self.pipeline.rebuild_reported(documents)
    }

    /// Answer `query` against `snapshot` (`None` means no corpus). HYBRID
    /// runs both branches concurrently and returns hospital then global.
    pub async fn run_query(&self, snapshot: Option<&CorpusSnapshot>, query: &str, mode: QueryMode) -> QueryResponse {
        if let Err(e) = self.analytics.record(query, mode) {
            warn!(error = %e, "failed to record query analytics");
        }
        info!(%mode, query_chars = query.chars().count(), "running query");

        let results = match mode {
            QueryMode::Hospital => vec![self.hospital_answer(snapshot, query).await],
            QueryMode::Global => vec![self.global_answer(query).await],
            QueryMode::Hybrid => {
                let (hospital, global) =
                    futures::join!(self.hospital_answer(snapshot, query), self.global_answer(query));
                vec![hospital, global]
            }
        };
        QueryResponse { query: query.to_string(), mode, results }
    }

    async fn hospital_answer(&self, snapshot: Option<&CorpusSnapshot>, query: &str) -> QueryResult {
        let Some(snapshot) = snapshot.filter(|s| !s.is_empty()) else {
            return unanswered(AnswerOrigin::Hospital, QueryStatus::NoEvidence, NO_CORPUS_ANSWER.to_string(), Vec::new());
        };
        let retrieved = match self.pipeline.query(snapshot, query, self.top_k) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "retrieval failed");
                let answer = format!("{RETRIEVAL_FAILED_ANSWER}: {e}");
                return unanswered(AnswerOrigin::Hospital, QueryStatus::RetrievalFailed, answer, Vec::new());
            }
        };
        if retrieved.is_empty() {
            return unanswered(AnswerOrigin::Hospital, QueryStatus::NoEvidence, INSUFFICIENT_EVIDENCE.to_string(), Vec::new());
        }
        let sources = source_labels(&retrieved);
        let synthesizer = match &self.synthesizer {
            Ok(s) => s,
            Err(reason) => return unanswered(AnswerOrigin::Hospital, QueryStatus::ConfigurationError, reason.clone(), sources),
        };

        let context = self.pipeline.assemble_context(&retrieved);
        let outcome = synthesizer.synthesize(query, &context).await;
        if !outcome.is_answered() {
            return unanswered(AnswerOrigin::Hospital, QueryStatus::BackendExhausted, outcome.answer, sources);
        }

        let chunk_texts: Vec<String> = retrieved.iter().map(|r| r.chunk.text.clone()).collect();
        let score = self.scorer.score(&outcome.answer, &chunk_texts).unwrap_or_else(|e| {
            warn!(error = %e, "evidence scoring failed");
            EvidenceScore::none()
        });
        QueryResult {
            origin: AnswerOrigin::Hospital,
            status: QueryStatus::Answered,
            confidence: confidence(&outcome.answer, retrieved.len()),
            answer: outcome.answer,
            evidence_level: score.level,
            evidence_coverage: score.coverage,
            sources,
        }
    }

    async fn global_answer(&self, query: &str) -> QueryResult {
        let synthesizer = match &self.synthesizer {
            Ok(s) => s,
            Err(reason) => return unanswered(AnswerOrigin::Global, QueryStatus::ConfigurationError, reason.clone(), Vec::new()),
        };
        let outcome = synthesizer.synthesize_open(query).await;
        if !outcome.is_answered() {
            return unanswered(AnswerOrigin::Global, QueryStatus::BackendExhausted, outcome.answer, Vec::new());
        }
        QueryResult {
            origin: AnswerOrigin::Global,
            status: QueryStatus::Answered,
            confidence: confidence(&outcome.answer, 0),
            answer: outcome.answer,
            evidence_level: EvidenceLevel::None,
            evidence_coverage: 0,
            sources: Vec::new(),
        }
    }
}

fn unanswered(origin: AnswerOrigin, status: QueryStatus, answer: String, sources: Vec<String>) -> QueryResult {
    QueryResult { origin, status, answer, evidence_level: EvidenceLevel::None, evidence_coverage: 0, confidence: 0, sources }
}

/// Labels in retrieval order, first occurrence only.
fn source_labels(retrieved: &[RetrievedChunk]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(retrieved.len());
    for r in retrieved {
        if !labels.contains(&r.chunk.source_label) {
            labels.push(r.chunk.source_label.clone());
        }
    }
    labels
}
