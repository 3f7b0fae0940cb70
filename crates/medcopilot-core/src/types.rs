//! Domain types shared by the indexing, retrieval and answer crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Positional identifier of a chunk inside one corpus generation.
pub type Handle = usize;

/// A bounded span of document text, the atomic unit of retrieval.
///
/// - `handle`: dense, zero-based position shared with the vector index
/// - `text`: the chunk payload handed to the embedder and the synthesizer
/// - `source_label`: originating document and page, e.g. `"fileA.pdf — Page 3"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub handle: Handle,
    pub text: String,
    pub source_label: String,
}

/// Format the provenance label for page `page` (1-based) of `filename`.
pub fn source_label(filename: &str, page: usize) -> String {
    format!("{filename} — Page {page}")
}

/// Raw bytes of an ingested document plus the name it arrived under.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { filename: filename.into(), bytes: bytes.into() }
    }
}

/// One nearest-neighbour result. `distance` is squared L2, lower is closer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub handle: Handle,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryMode {
    Hospital,
    Global,
    Hybrid,
}

impl QueryMode {
    pub fn uses_hospital(self) -> bool { matches!(self, Self::Hospital | Self::Hybrid) }
    pub fn uses_global(self) -> bool { matches!(self, Self::Global | Self::Hybrid) }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hospital => "HOSPITAL",
            Self::Global => "GLOBAL",
            Self::Hybrid => "HYBRID",
        };
        f.write_str(s)
    }
}

impl FromStr for QueryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hospital" | "hospital ai" => Ok(Self::Hospital),
            "global" | "global ai" => Ok(Self::Global),
            "hybrid" | "hybrid ai" => Ok(Self::Hybrid),
            other => Err(Error::InvalidConfig(format!("unknown query mode '{other}'"))),
        }
    }
}

/// How strongly a generated answer is semantically supported by its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceLevel {
    Strong,
    Partial,
    None,
}

impl fmt::Display for EvidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Strong => "STRONG",
            Self::Partial => "PARTIAL",
            Self::None => "NONE",
        };
        f.write_str(s)
    }
}

/// Which branch of a query produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    Hospital,
    Global,
}

/// Outcome of one branch. Every variant still carries a renderable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Answered,
    NoEvidence,
    /// The corpus exists but could not be searched (embedding or index failure).
    RetrievalFailed,
    BackendExhausted,
    ConfigurationError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub origin: AnswerOrigin,
    pub status: QueryStatus,
    pub answer: String,
    pub evidence_level: EvidenceLevel,
    /// 0..=100
    pub evidence_coverage: u8,
    /// 0..=100
    pub confidence: u8,
    pub sources: Vec<String>,
}

/// Everything `run_query` hands back to the presentation layer.
///
/// HOSPITAL and GLOBAL produce one result; HYBRID produces the hospital
/// result followed by the global one, computed independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub mode: QueryMode,
    pub results: Vec<QueryResult>,
}

impl QueryResponse {
    pub fn hospital(&self) -> Option<&QueryResult> {
        self.results.iter().find(|r| r.origin == AnswerOrigin::Hospital)
    }

    pub fn global(&self) -> Option<&QueryResult> {
        self.results.iter().find(|r| r.origin == AnswerOrigin::Global)
    }

    /// Concatenate the answers of all branches under their headings.
    pub fn combined_answer(&self) -> String {
        self.results
            .iter()
            .map(|r| {
                let heading = match r.origin {
                    AnswerOrigin::Hospital => "Hospital evidence",
                    AnswerOrigin::Global => "Global research",
                };
                format!("## {heading}\n\n{}", r.answer)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A single outbound call to the generative backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub query: String,
    pub mode: QueryMode,
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsRecord {
    pub fn now(query: &str, mode: QueryMode) -> Self {
        Self { query: query.to_string(), mode, timestamp: Utc::now() }
    }
}
