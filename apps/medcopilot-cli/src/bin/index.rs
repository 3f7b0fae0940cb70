use std::path::PathBuf;
use std::time::Duration;
use std::{env, process};

use indicatif::{ProgressBar, ProgressStyle};
use medcopilot_cli::{index_dir, init_tracing, load_settings};
use medcopilot_core::config::expand_path;
use medcopilot_core::documents::load_documents_from_dir;
use medcopilot_embed::init_embedder;
use medcopilot_rag::RetrievalPipeline;
use medcopilot_vector::{remove_snapshot, write_snapshot};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = load_settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut data_dir = None;
    let mut clear = false;
    for arg in &args {
        match arg.as_str() {
            "--clear" => clear = true,
            "--help" | "-h" => {
                println!("Usage: medcopilot-index [data_dir] [--clear]");
                return Ok(());
            }
            a if !a.starts_with('-') => data_dir = Some(PathBuf::from(a)),
            other => {
                eprintln!("Error: unknown flag {other}");
                process::exit(2);
            }
        }
    }
    let store_dir = index_dir(&settings);

    if clear {
        remove_snapshot(&store_dir)?;
        println!("🗑️  Cleared hospital corpus at {}", store_dir.display());
        return Ok(());
    }

    let data_dir = data_dir.unwrap_or_else(|| expand_path(&settings.storage.data_dir));
    println!("MedCopilot Indexer\n==================");
    println!("Evidence directory: {}", data_dir.display());
    println!("Corpus store: {}", store_dir.display());

    let documents = load_documents_from_dir(&data_dir)?;
    let embedder = init_embedder(&settings.embedding)?;
    let pipeline = RetrievalPipeline::new(embedder, &settings);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Chunking and embedding {} documents", documents.len()));
    let outcome = pipeline.rebuild_reported(&documents);
    pb.finish_and_clear();

    let report = &outcome.report;
    for skipped in &report.skipped {
        println!("⚠️  Skipped {}: {}", skipped.filename, skipped.reason);
    }
    if let Some(failure) = &report.failure {
        eprintln!("❌ Rebuild failed, existing corpus left untouched: {failure}");
        process::exit(1);
    }
    match &outcome.snapshot {
        Some(snapshot) => write_snapshot(&store_dir, snapshot)?,
        None => {
            remove_snapshot(&store_dir)?;
            println!("⚠️  No usable evidence found; the hospital corpus is now empty");
        }
    }
    println!("\n✅ Indexing completed in {} ms", report.elapsed_ms);
    println!("📊 {} documents, {} pages, {} chunks", report.documents, report.pages, report.chunks);
    println!("\n💡 To ask a question, use: cargo run --bin medcopilot-ask '<question>' --mode hybrid");
    Ok(())
}
