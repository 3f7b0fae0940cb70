//! OpenAI-compatible chat completions client (Groq by default).
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use medcopilot_core::config::BackendSettings;
use medcopilot_core::error::{BackendError, Error, Result};
use medcopilot_core::traits::GenerativeBackend;
use medcopilot_core::types::CompletionRequest;

const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletionsBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ChatCompletionsBackend {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    /// Reads the key from the configured environment variable. A missing or
    /// blank key is a configuration error, surfaced before any request.
    pub fn from_settings(settings: &BackendSettings) -> Result<Self> {
        match std::env::var(&settings.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(&settings.base_url, key.trim())),
            _ => Err(Error::Configuration(format!(
                "environment variable {} is not set; external AI is unavailable",
                settings.api_key_env
            ))),
        }
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

fn request_body(request: &CompletionRequest) -> ChatRequest<'_> {
    ChatRequest {
        model: &request.model,
        messages: [
            ChatMessage { role: "system", content: &request.system_prompt },
            ChatMessage { role: "user", content: &request.user_prompt },
        ],
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn parse_completion(model: &str, body: &str) -> std::result::Result<String, BackendError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(format!("{model}: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| BackendError::Malformed(format!("{model}: response had no answer text")))
}

#[async_trait]
impl GenerativeBackend for ChatCompletionsBackend {
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, BackendError> {
        debug!(model = %request.model, prompt_chars = request.user_prompt.chars().count(), "sending chat completion");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| BackendError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(BackendError::Rejected {
                model: request.model.clone(),
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }
        parse_completion(&request.model, &body)
    }
}
