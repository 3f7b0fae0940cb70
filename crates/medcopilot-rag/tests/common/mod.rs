#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use medcopilot_core::config::Settings;
use medcopilot_core::error::{BackendError, Error};
use medcopilot_core::traits::{AnalyticsSink, Embedder};
use medcopilot_core::types::{CompletionRequest, QueryMode, RawDocument};
use medcopilot_embed::HashingEmbedder;
use medcopilot_rag::{AnswerSynthesizer, EvidenceScorer, NoopSink, QueryEngine, RetrievalPipeline};

pub enum Reply {
    Text(String),
    Fail(BackendError),
    Hang,
}

/// Answers per model name and records every request it sees.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: HashMap<String, Reply>,
    pub calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self { Self::default() }

    pub fn reply(mut self, model: &str, reply: Reply) -> Self {
        self.replies.insert(model.to_string(), reply);
        self
    }

    /// Every default model answers with `text`.
    pub fn always(text: &str) -> Self {
        Settings::default()
            .synthesis
            .models
            .iter()
            .fold(Self::new(), |b, m| b.reply(m, Reply::Text(text.to_string())))
    }

    pub fn call_count(&self) -> usize { self.calls.lock().expect("calls lock").len() }

    pub fn models_called(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").iter().map(|r| r.model.clone()).collect()
    }
}

#[async_trait]
impl medcopilot_core::traits::GenerativeBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        self.calls.lock().expect("calls lock").push(request.clone());
        match self.replies.get(&request.model) {
            Some(Reply::Text(t)) => Ok(t.clone()),
            Some(Reply::Fail(e)) => Err(e.clone()),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(BackendError::Transport("hung".into()))
            }
            None => Err(BackendError::Rejected { model: request.model.clone(), status: 404, message: "unknown model".into() }),
        }
    }
}

pub struct FailingSink;

impl AnalyticsSink for FailingSink {
    fn record(&self, _query: &str, _mode: QueryMode) -> anyhow::Result<()> { anyhow::bail!("disk full") }
}

pub fn hashing_embedder() -> Arc<dyn Embedder> { Arc::new(HashingEmbedder::new(4096)) }

pub fn engine_with(backend: Option<Arc<ScriptedBackend>>, analytics: Arc<dyn AnalyticsSink>) -> QueryEngine {
    let settings = Settings::default();
    let embedder = hashing_embedder();
    let synthesizer = match backend {
        Some(b) => Ok(AnswerSynthesizer::new(b, settings.synthesis.clone())),
        None => Err(Error::Configuration("environment variable GROQ_API_KEY is not set".into())),
    };
    QueryEngine::new(
        RetrievalPipeline::new(embedder.clone(), &settings),
        EvidenceScorer::new(embedder, settings.scoring.clone()),
        synthesizer,
        analytics,
        settings.retrieval.top_k,
    )
}

pub fn engine(backend: Option<Arc<ScriptedBackend>>) -> QueryEngine { engine_with(backend, Arc::new(NoopSink)) }

pub const SEPSIS_PAGE: &str = "Sepsis protocol for adult patients with suspected sepsis: draw lactate, obtain blood cultures \
before antibiotics, start broad spectrum antibiotics within one hour, give crystalloid for hypotension, then reassess \
volume status and escalate to critical care. Follow this sepsis protocol on every ward.";

pub const SEPSIS_ANSWER: &str = "Per the sepsis protocol, draw lactate, obtain blood cultures before antibiotics and start \
broad spectrum antibiotics within one hour; give crystalloid for hypotension.";

/// Two documents, two pages each, one chunk per page.
pub fn hospital_documents() -> Vec<RawDocument> {
    let ward = format!(
        "Hand hygiene on the ward: clean hands with alcohol rub before and after every patient contact, after removing \
gloves, and before any aseptic task. Audit compliance weekly and report results to infection control nurses.\u{000C}{SEPSIS_PAGE}"
    );
    let pharmacy = "Anticoagulation service: warfarin doses are adjusted against INR results, which are checked twice \
weekly until stable. Direct oral anticoagulants need renal function monitoring every six months for elderly inpatients.\u{000C}\
Discharge medicines reconciliation: pharmacists compare the admission medication list with discharge prescriptions, counsel \
patients on changes, and send a summary to the general practitioner within two working days.";
    vec![RawDocument::new("ward_protocols.txt", ward), RawDocument::new("pharmacy.txt", pharmacy)]
}
