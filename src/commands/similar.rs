use anyhow::Result;
use colored::*;

use super::{colored_score, truncate};
use pdf_sentence_search::config::Config;
use pdf_sentence_search::search::engine::SearchEngine;
use pdf_sentence_search::SearchError;

pub fn run(config: &Config, doc_id: &str, position: usize, limit: Option<usize>, json: bool) -> Result<()> {
    let mut engine = SearchEngine::new(config)?;
    let limit = limit.unwrap_or(config.default_limit);

    let source = engine.db().sentence_at(doc_id, position)?;
    let hits = match engine.similar(doc_id, position, limit) {
        Ok(hits) => hits,
        Err(e @ (SearchError::DocumentNotFound(_) | SearchError::SentenceNotFound { .. })) => {
            println!("{}", e.to_string().red());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    println!("{}", "Similar Sentences".bold());
    println!("{}", "=".repeat(60));
    println!("Source: {} #{}", doc_id.cyan(), position);
    if let Some((sentence, _)) = source {
        println!("  {}", truncate(&sentence.text, 240).dimmed());
    }
    println!();

    if hits.is_empty() {
        println!("{}", "No similar sentences found.".yellow());
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. [{}] {} {}",
            (i + 1).to_string().bold(),
            colored_score(hit.score),
            hit.doc_id.cyan(),
            format!("#{}", hit.position).dimmed()
        );
        println!("   {}", truncate(&hit.sentence, 240));
        println!();
    }

    Ok(())
}
