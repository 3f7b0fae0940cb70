//! Shared setup for the medcopilot binaries.
use std::path::PathBuf;
use std::sync::{Arc, Once};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use medcopilot_core::config::{expand_path, Settings};
use medcopilot_core::traits::Embedder;
use medcopilot_core::types::{QueryMode, QueryResponse};
use medcopilot_embed::{init_embedder, HashingEmbedder};
use medcopilot_rag::QueryEngine;
use medcopilot_vector::load_snapshot;

static INIT: Once = Once::new();

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}

pub fn load_settings() -> anyhow::Result<Settings> {
    Settings::load().map_err(|e| {
        eprintln!("Error loading config: {e:#}");
        e
    })
}

pub fn index_dir(settings: &Settings) -> PathBuf { expand_path(&settings.storage.index_dir) }

/// The embedder a query in `mode` needs. GLOBAL never embeds, so it gets the
/// hashing embedder and does not require the BGE-M3 model on disk.
pub fn embedder_for_mode(settings: &Settings, mode: QueryMode) -> anyhow::Result<Arc<dyn Embedder>> {
    if mode.uses_hospital() {
        init_embedder(&settings.embedding)
    } else {
        debug!(%mode, "skipping model load, mode does not search hospital evidence");
        Ok(Arc::new(HashingEmbedder::new(settings.embedding.fake_dim)))
    }
}

/// Load what `mode` needs and answer `query`.
pub async fn ask(settings: &Settings, query: &str, mode: QueryMode) -> anyhow::Result<QueryResponse> {
    let snapshot = if mode.uses_hospital() { load_snapshot(&index_dir(settings))? } else { None };
    let engine = QueryEngine::from_settings(settings, embedder_for_mode(settings, mode)?);
    Ok(engine.run_query(snapshot.as_ref(), query, mode).await)
}

/// Value following `flag`, exiting with a usage error when it is missing.
pub fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => {
            eprintln!("Error: {flag} requires a value");
            std::process::exit(2);
        }
    }
}
