//! Embedding providers and their process-wide lifecycle.
//!
//! The provider is built once by [`init_embedder`] and shared as an
//! `Arc<dyn Embedder>` for both document and query embedding, so the two
//! vector spaces are always comparable. A second `init_embedder` call returns
//! the instance that already exists; switching models requires a restart.
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use medcopilot_core::config::{expand_path, EmbeddingSettings};
pub use medcopilot_core::traits::Embedder;

pub mod cache;
pub mod device;
pub mod hashing;
pub mod pool;
pub mod tokenize;

pub use cache::CachedEmbedder;
pub use hashing::HashingEmbedder;
pub use pool::masked_mean_l2;

pub const BGE_M3_DIM: usize = 1024;
const BGE_M3_MAX_LEN: usize = 256;
const FORWARD_BATCH: usize = 16;

/// BGE-M3 (XLM-RoBERTa) loaded from local files and run with candle.
pub struct BgeM3Embedder { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device }

impl BgeM3Embedder {
    pub fn new(model_dir: Option<&str>) -> Result<Self> {
        let device = device::select_device();
        let model_dir = resolve_model_dir(model_dir)?;
        info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!("BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device })
    }

    fn embed_group(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize::tokenize_batch(&self.tokenizer, texts, BGE_M3_MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((texts.len(), BGE_M3_MAX_LEN), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        if let Some(row) = rows.iter().find(|r| r.len() != BGE_M3_DIM) {
            return Err(anyhow!("unexpected embedding width {} (expected {})", row.len(), BGE_M3_DIM));
        }
        Ok(rows)
    }
}

impl Embedder for BgeM3Embedder {
    fn dim(&self) -> usize { BGE_M3_DIM }
    fn max_len(&self) -> usize { BGE_M3_MAX_LEN }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for group in texts.chunks(FORWARD_BATCH) {
            out.extend(self.embed_group(group)?);
        }
        debug!(texts = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([Path::new("../models/bge-m3").to_path_buf(), Path::new("models/bge-m3").to_path_buf()]);
    for dir in candidates {
        if dir.exists() { return Ok(dir); }
        debug!(dir = %dir.display(), "model dir candidate missing");
    }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}

fn fake_requested(settings: &EmbeddingSettings) -> bool {
    settings.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Build a provider according to `settings` without touching the singleton.
pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let base: Arc<dyn Embedder> = if fake_requested(settings) {
        warn!(dim = settings.fake_dim, "using hashing embedder, results are lexical only");
        Arc::new(HashingEmbedder::new(settings.fake_dim))
    } else {
        Arc::new(BgeM3Embedder::new(settings.model_dir.as_deref())?)
    };
    if settings.cache {
        Ok(Arc::new(CachedEmbedder::new(base, settings.cache_capacity)))
    } else {
        Ok(base)
    }
}

static EMBEDDER: OnceLock<Arc<dyn Embedder>> = OnceLock::new();

/// Initialise the process-wide embedder, or return the existing one.
pub fn init_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if let Some(existing) = EMBEDDER.get() {
        return Ok(Arc::clone(existing));
    }
    let built = build_embedder(settings)?;
    Ok(Arc::clone(EMBEDDER.get_or_init(|| built)))
}

/// The process-wide embedder, if [`init_embedder`] has run.
pub fn embedder() -> Option<Arc<dyn Embedder>> { EMBEDDER.get().cloned() }
