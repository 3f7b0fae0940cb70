//! Answer synthesis over an ordered chain of models.
//!
//! Each model gets one attempt bounded by the configured timeout. The first
//! success wins; when every model fails the outcome carries the last error
//! and an apology text instead of an `Err`.
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use medcopilot_core::chunker::truncate_chars;
use medcopilot_core::config::SynthesisSettings;
use medcopilot_core::error::BackendError;
use medcopilot_core::traits::GenerativeBackend;
use medcopilot_core::types::CompletionRequest;

pub const INSUFFICIENT_EVIDENCE: &str = "Insufficient hospital evidence.";

pub const GROUNDED_SYSTEM_PROMPT: &str = "You are a clinical evidence assistant for a hospital. \
Answer ONLY from the hospital evidence provided in the user message and do not use outside knowledge. \
If the evidence does not answer the question, reply exactly: Insufficient hospital evidence.";

pub const OPEN_SYSTEM_PROMPT: &str = "You are a medical research AI. Provide evidence-based medical information.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutcome {
    pub answer: String,
    /// Model that produced `answer`; `None` when the chain was exhausted.
    pub model: Option<String>,
    pub error: Option<String>,
}

impl SynthesisOutcome {
    pub fn is_answered(&self) -> bool { self.error.is_none() }
}

pub struct AnswerSynthesizer {
    backend: Arc<dyn GenerativeBackend>,
    settings: SynthesisSettings,
}

impl AnswerSynthesizer {
    pub fn new(backend: Arc<dyn GenerativeBackend>, settings: SynthesisSettings) -> Self {
        Self { backend, settings }
    }

    /// Grounded mode: the model may only use `context`.
    pub async fn synthesize(&self, query: &str, context: &str) -> SynthesisOutcome {
        let prompt = format!("Question: {query}\n\nHospital evidence:\n{context}");
        self.run(GROUNDED_SYSTEM_PROMPT, &prompt, self.settings.grounded_temperature).await
    }

    /// Open mode: general medical knowledge, no retrieved context.
    pub async fn synthesize_open(&self, query: &str) -> SynthesisOutcome {
        self.run(OPEN_SYSTEM_PROMPT, query, self.settings.open_temperature).await
    }

    async fn run(&self, system_prompt: &str, user_prompt: &str, temperature: f32) -> SynthesisOutcome {
        let user_prompt = truncate_chars(user_prompt, self.settings.max_prompt_chars);
        let secs = self.settings.attempt_timeout_secs;
        let mut last_error: Option<BackendError> = None;

        for model in &self.settings.models {
            let request = CompletionRequest {
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
                model: model.clone(),
                max_tokens: self.settings.max_tokens,
                temperature,
            };
            let attempt = match timeout(Duration::from_secs(secs), self.backend.complete(&request)).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout { model: model.clone(), secs }),
            };
            match attempt {
                Ok(answer) => {
                    info!(model = %model, "answer synthesized");
                    return SynthesisOutcome { answer, model: Some(model.clone()), error: None };
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "model attempt failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.map_or_else(|| "no models configured".to_string(), |e| e.to_string());
        warn!(error = %error, "all models failed");
        SynthesisOutcome {
            answer: format!("All AI models are currently unavailable. Last error: {error}"),
            model: None,
            error: Some(error),
        }
    }
}
