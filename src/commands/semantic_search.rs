//! Search command - sentences ranked by semantic similarity

use anyhow::Result;
use colored::Colorize;

use super::{colored_score, truncate};
use pdf_sentence_search::config::Config;
use pdf_sentence_search::search::engine::{keyword_search, SearchEngine, SearchHit, SearchOptions};

pub struct Flags {
    pub limit: Option<usize>,
    pub min_score: Option<f32>,
    pub doc: Option<String>,
    pub context: usize,
    pub json: bool,
    pub fallback: bool,
}

/// Run semantic search command
pub fn run(config: &Config, query: &str, flags: Flags) -> Result<()> {
    let db_path = config.paths().db;
    let limit = flags.limit.unwrap_or(config.default_limit);

    if !db_path.exists() {
        eprintln!(
            "{} Index not found. Run {} first.",
            "!".yellow().bold(),
            "pss index".cyan()
        );
        std::process::exit(1);
    }

    let mut engine = SearchEngine::new(config)?;

    let results = if flags.fallback {
        if !flags.json {
            println!("{} Using keyword search (no embeddings)", "!".yellow());
            println!();
        }
        keyword_search(engine.db(), query, limit)?
    } else {
        let options = SearchOptions {
            limit,
            min_score: flags.min_score,
            document: flags.doc,
            context: flags.context,
        };
        engine.search(query, &options)?
    };

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    print_hits(query, &results);
    Ok(())
}

pub fn print_hits(query: &str, results: &[SearchHit]) {
    if results.is_empty() {
        println!("{} No results found for: {}", "→".dimmed(), query.cyan());
        return;
    }

    println!(
        "{} {} results for: {}",
        "→".dimmed(),
        results.len(),
        query.cyan()
    );
    println!();

    for (i, hit) in results.iter().enumerate() {
        println!(
            "{}. [{}] {} {}",
            (i + 1).to_string().bold(),
            colored_score(hit.score),
            hit.title.cyan(),
            format!("#{}", hit.position).dimmed()
        );

        for before in &hit.context_before {
            println!("   {}", truncate(before, 160).dimmed());
        }
        println!("   {}", truncate(&hit.sentence, 240));
        for after in &hit.context_after {
            println!("   {}", truncate(after, 160).dimmed());
        }
        println!();
    }
}
