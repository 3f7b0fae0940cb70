use std::env;
use std::path::PathBuf;

use medcopilot_cli::{init_tracing, load_settings};
use medcopilot_core::config::expand_path;
use medcopilot_rag::summarize;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = load_settings()?;
    let path = env::args()
        .nth(1)
        .map_or_else(|| expand_path(&settings.analytics.path), PathBuf::from);
    let summary = summarize(&path)?;
    println!("📈 Query analytics ({})\n=================", path.display());
    println!("Total queries:   {}", summary.total);
    println!("Hospital AI:     {}", summary.hospital);
    println!("Global AI:       {}", summary.global);
    println!("Hybrid AI:       {}", summary.hybrid);
    if summary.skipped > 0 {
        println!("⚠️  {} unreadable records skipped", summary.skipped);
    }
    Ok(())
}
