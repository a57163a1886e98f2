//! One-shot question commands: `tqa transcript`, `tqa ask`, `tqa retrieve`.
//!
//! Each command builds the service, indexes the transcript in memory and
//! exits. Nothing but history is persisted between runs.

use anyhow::Result;

use crate::bootstrap::build_service;
use crate::config::Config;

/// Print parsed utterances, one per line.
pub async fn run_transcript(config: &Config) -> Result<()> {
    let service = build_service(config).await?;
    let lines = service.transcript();

    if lines.is_empty() {
        println!("No utterances found in {}.", config.transcript.path.display());
        return Ok(());
    }

    for (i, line) in lines.iter().enumerate() {
        println!("{:>4}  {}: {}", i, line.speaker, line.text);
    }
    println!();
    println!("{} utterances", lines.len());
    Ok(())
}

/// Answer one question and record it in history.
///
/// Provider failures are reported through the fallback answer, so this
/// only errors on configuration or database problems.
pub async fn run_ask(config: &Config, question: &str, json: bool) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("question must not be empty");
    }

    let service = build_service(config).await?;
    if let Err(e) = service.initialize().await {
        tracing::warn!(error = %e, "transcript indexing failed");
    }

    let response = service.ask(question).await;
    service.drain_pending().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.answer);
    if !response.relevant_quotes.is_empty() {
        println!();
        println!("Relevant quotes:");
        for quote in &response.relevant_quotes {
            println!("  > {}", quote);
        }
    }
    println!();
    println!("Confidence: {:.0}%", response.confidence * 100.0);
    Ok(())
}

/// Print the ranked chunks retrieved for `question`, without synthesis.
pub async fn run_retrieve(config: &Config, question: &str, k: Option<usize>) -> Result<()> {
    let service = build_service(config).await?;
    service.initialize().await?;

    let k = k.unwrap_or(config.retrieval.debug_k);
    let chunks = service.retrieve(question, k).await?;

    if chunks.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, chunk) in chunks.iter().enumerate() {
        let kind = serde_json::to_value(chunk.metadata.kind)?;
        println!(
            "{}. [{:.4}] {} {:?}",
            i + 1,
            chunk.score,
            kind.as_str().unwrap_or("unknown"),
            chunk.metadata.source_indices
        );
        for line in chunk.content.lines() {
            println!("    {}", line);
        }
        println!();
    }
    Ok(())
}
