//! Extract command - show what the indexer would scrape from one file

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

use pdf_sentence_search::config::Config;
use pdf_sentence_search::core::document::Document;
use pdf_sentence_search::core::text::{clean_text, Sentence};

#[derive(Serialize)]
struct Extraction<'a> {
    path: String,
    kind: &'static str,
    size_bytes: u64,
    characters: usize,
    sentences: &'a [Sentence],
}

pub fn run(config: &Config, file: &Path, raw: bool, json: bool) -> Result<()> {
    let document =
        Document::load(file).with_context(|| format!("Failed to extract {}", file.display()))?;

    if raw {
        println!("{}", clean_text(&document.text));
        return Ok(());
    }

    let sentences = document.sentences(&config.filter);

    if json {
        let extraction = Extraction {
            path: document.path.display().to_string(),
            kind: document.kind.as_str(),
            size_bytes: document.size,
            characters: document.text.chars().count(),
            sentences: &sentences,
        };
        println!("{}", serde_json::to_string_pretty(&extraction)?);
        return Ok(());
    }

    println!("{}", document.name.bold());
    println!("{}", "=".repeat(60));
    println!(
        "{} characters, {} sentences (min {} words)",
        document.text.chars().count(),
        sentences.len().to_string().cyan(),
        config.filter.min_words
    );
    println!();

    if sentences.is_empty() {
        println!(
            "{}",
            "No sentences extracted (scanned or image-only PDF?)".yellow()
        );
    }
    for sentence in &sentences {
        println!("{} {}", format!("{:>4}", sentence.position).dimmed(), sentence.text);
    }

    Ok(())
}
