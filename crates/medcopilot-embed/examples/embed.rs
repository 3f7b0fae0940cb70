use medcopilot_core::config::Settings;
use medcopilot_embed::init_embedder;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let embedder = init_embedder(&settings.embedding)?;
    let texts = vec!["sepsis bundle within one hour".to_string(), "post-operative delirium screening".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("B={} dim={}", embs.len(), embedder.dim());
    Ok(())
}
