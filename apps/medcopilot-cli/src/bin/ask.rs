use std::{env, process};

use medcopilot_cli::{ask, flag_value, init_tracing, load_settings};
use medcopilot_core::types::{AnswerOrigin, QueryMode, QueryStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut settings = load_settings()?;
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <question> [--mode hospital|global|hybrid] [--k N] [--json]", args[0]);
        eprintln!("Example: {} 'sepsis protocol' --mode hybrid --k 4", args[0]);
        process::exit(1);
    }
    let query = args[1].clone();
    let mut mode = QueryMode::Hybrid;
    let mut json = false;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--mode" => {
                mode = flag_value(&args, i, "--mode").parse()?;
                i += 1;
            }
            "--k" => {
                match flag_value(&args, i, "--k").parse::<usize>() {
                    Ok(k) if k > 0 => settings.retrieval.top_k = k,
                    _ => {
                        eprintln!("Error: --k requires a positive number");
                        process::exit(2);
                    }
                }
                i += 1;
            }
            "--json" => json = true,
            other => {
                eprintln!("Error: unexpected argument {other}");
                process::exit(2);
            }
        }
        i += 1;
    }

    let response = ask(&settings, &query, mode).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }
    println!("🩺 medcopilot-ask\n================");
    println!("Question: {query}");
    println!("Mode: {mode}");
    for result in &response.results {
        let heading = match result.origin {
            AnswerOrigin::Hospital => "🏥 Hospital evidence",
            AnswerOrigin::Global => "🌍 Global research",
        };
        println!("\n{heading}\n{}", "-".repeat(heading.chars().count()));
        println!("{}", result.answer);
        if result.status == QueryStatus::Answered {
            println!(
                "\n   Evidence: {} ({}% coverage)  Confidence: {}%",
                result.evidence_level, result.evidence_coverage, result.confidence
            );
        } else {
            println!("\n   Status: {:?}", result.status);
        }
        for (n, source) in result.sources.iter().enumerate() {
            println!("   {}. 📄 {source}", n + 1);
        }
    }
    Ok(())
}
