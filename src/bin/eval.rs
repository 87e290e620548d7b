use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use textbook_chat::chat::NO_CONTEXT_ANSWER;
use textbook_chat::client::{parse_answer, Segment};
use textbook_chat::models::ChatRequest;
use textbook_chat::{AppConfig, ChatService};

#[derive(Parser, Debug)]
#[command(name = "eval")]
#[command(about = "Run a local retrieval/answer evaluation set")]
struct Cli {
    #[arg(long, default_value = "eval/prompts.jsonl")]
    file: String,
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct EvalPrompt {
    id: String,
    question: String,
    #[serde(default)]
    expect_contains: Vec<String>,
    #[serde(default)]
    expect_fallback: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    let chat = ChatService::from_config(&config)?;

    let prompts = load_prompts(&cli.file)?;
    if prompts.is_empty() {
        anyhow::bail!("no prompts found in {}", cli.file);
    }

    let mut total = 0usize;
    let mut pass_contains = 0usize;
    let mut fallback_count = 0usize;
    let mut with_citations = 0usize;
    let mut marker_count = 0usize;
    let mut dangling_count = 0usize;

    for prompt in prompts {
        total += 1;
        let response = chat
            .answer(ChatRequest {
                message: prompt.question.clone(),
            })
            .await
            .with_context(|| format!("failed eval prompt {}", prompt.id))?;

        let is_fallback = response.answer == NO_CONTEXT_ANSWER;
        if is_fallback {
            fallback_count += 1;
        }

        let parsed = parse_answer(&response.answer, &response.sources);
        if !parsed.citations.is_empty() {
            with_citations += 1;
        }
        for segment in &parsed.segments {
            if let Segment::Marker { citation, .. } = segment {
                marker_count += 1;
                if citation.is_none() {
                    dangling_count += 1;
                }
            }
        }

        let answer_lower = response.answer.to_ascii_lowercase();
        let contains_pass = prompt
            .expect_contains
            .iter()
            .all(|needle| answer_lower.contains(&needle.to_ascii_lowercase()))
            && prompt.expect_fallback.unwrap_or(false) == is_fallback;
        if contains_pass {
            pass_contains += 1;
        }

        if cli.verbose {
            println!("--- {} ---", prompt.id);
            println!("Q: {}", prompt.question);
            println!("A: {}", response.answer.replace('\n', " "));
            println!(
                "Sources: {} Citations: {}",
                response.sources.len(),
                parsed.citations.len()
            );
            println!();
        }
    }

    println!("Eval prompts: {}", total);
    println!(
        "Contains/expected accuracy: {:.1}%",
        ratio(pass_contains, total) * 100.0
    );
    println!("Citation rate: {:.1}%", ratio(with_citations, total) * 100.0);
    println!("Fallback rate: {:.1}%", ratio(fallback_count, total) * 100.0);
    println!(
        "Dangling markers: {:.1}% ({}/{})",
        ratio(dangling_count, marker_count) * 100.0,
        dangling_count,
        marker_count
    );

    Ok(())
}

fn load_prompts(path: &str) -> Result<Vec<EvalPrompt>> {
    let file = File::open(path).with_context(|| format!("failed opening {}", path))?;
    let reader = BufReader::new(file);
    let mut prompts = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parsed: EvalPrompt = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON at {} line {}", path, idx + 1))?;
        prompts.push(parsed);
    }

    Ok(prompts)
}

fn ratio(n: usize, d: usize) -> f32 {
    if d == 0 {
        return 0.0;
    }
    n as f32 / d as f32
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
