//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_SCORING__STRONG_THRESHOLD=0.5`).
//! Every tunable constant of the pipeline lives in [`Settings`] with defaults
//! that apply when no file or variable overrides them.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub scoring: ScoringSettings,
    pub synthesis: SynthesisSettings,
    pub backend: BackendSettings,
    pub embedding: EmbeddingSettings,
    pub storage: StorageSettings,
    pub analytics: AnalyticsSettings,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> { Config::load()?.settings() }

    pub fn validate(&self) -> Result<(), Error> {
        let c = &self.chunking;
        if c.size == 0 {
            return Err(Error::InvalidConfig("chunking.size must be > 0".into()));
        }
        if c.overlap >= c.size {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than chunking.size ({})",
                c.overlap, c.size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be > 0".into()));
        }
        let s = &self.scoring;
        if s.partial_threshold > s.strong_threshold {
            return Err(Error::InvalidConfig(format!(
                "scoring.partial_threshold ({}) must not exceed scoring.strong_threshold ({})",
                s.partial_threshold, s.strong_threshold
            )));
        }
        if self.embedding.cache && self.embedding.cache_capacity == 0 {
            return Err(Error::InvalidConfig("embedding.cache_capacity must be > 0 when the cache is enabled".into()));
        }
        if self.synthesis.models.is_empty() {
            return Err(Error::InvalidConfig("synthesis.models must list at least one model".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Window length in characters.
    pub size: usize,
    /// Characters shared by consecutive windows; must be < `size`.
    pub overlap: usize,
    /// Windows shorter than this (after trimming) are dropped as noise.
    pub min_chars: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self { Self { size: 800, overlap: 150, min_chars: 150 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub max_context_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { top_k: 4, max_context_chars: 6000 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub strong_threshold: f32,
    pub partial_threshold: f32,
}

impl Default for ScoringSettings {
    fn default() -> Self { Self { strong_threshold: 0.45, partial_threshold: 0.20 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// Tried in order; the first success wins.
    pub models: Vec<String>,
    pub attempt_timeout_secs: u64,
    pub max_prompt_chars: usize,
    pub max_tokens: u32,
    pub grounded_temperature: f32,
    pub open_temperature: f32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            models: vec![
                "llama-3.1-8b-instant".to_string(),
                "llama-3.3-70b-versatile".to_string(),
                "gemma2-9b-it".to_string(),
            ],
            attempt_timeout_secs: 30,
            max_prompt_chars: 12_000,
            max_tokens: 800,
            grounded_temperature: 0.2,
            open_temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// OpenAI-compatible API root; `/chat/completions` is appended.
    pub base_url: String,
    /// Name of the environment variable holding the bearer key.
    pub api_key_env: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub use_fake: bool,
    pub fake_dim: usize,
    pub model_dir: Option<String>,
    /// Wrap the provider in the content-hash cache.
    pub cache: bool,
    /// Most vectors the cache holds before evicting the least recently used.
    pub cache_capacity: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self { Self { use_fake: false, fake_dim: 1024, model_dir: None, cache: true, cache_capacity: 20_000 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub index_dir: String,
    pub data_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { index_dir: "~/.medcopilot/index".to_string(), data_dir: "data/evidence".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub enabled: bool,
    pub path: String,
}

impl Default for AnalyticsSettings {
    fn default() -> Self { Self { enabled: true, path: "~/.medcopilot/analytics.jsonl".to_string() } }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
