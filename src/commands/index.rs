//! Index command - Build the sentence index

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use pdf_sentence_search::config::{Config, EmbedderKind};
use pdf_sentence_search::search::engine::SearchEngine;
use pdf_sentence_search::search::vectordb::VectorDB;

/// Run index command
pub fn run(config: &Config, status_only: bool, rebuild: bool, json: bool) -> Result<()> {
    let db_path = config.paths().db;

    if status_only {
        return show_status(&db_path, json);
    }

    if config.embedder == EmbedderKind::Onnx {
        check_model(config, json);
    }

    let mut engine = SearchEngine::new(config)?;

    if !json {
        println!(
            "{} Building sentence index for {}...",
            "→".dimmed(),
            config.corpus_dir.display()
        );
    }

    let stats = engine.index_all(rebuild)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!();
        println!(
            "{} Indexed {} documents ({} sentences) in {:.2}s",
            "✓".green().bold(),
            stats.indexed.to_string().cyan(),
            stats.sentences.to_string().cyan(),
            stats.duration_ms as f64 / 1000.0
        );
        if stats.unchanged > 0 {
            println!("  {} {} documents unchanged", "→".dimmed(), stats.unchanged);
        }
        if stats.skipped > 0 {
            println!(
                "  {} {} documents skipped (no extractable text)",
                "→".dimmed(),
                stats.skipped
            );
        }
        if stats.removed > 0 {
            println!(
                "  {} {} deleted documents removed from index",
                "→".dimmed(),
                stats.removed
            );
        }
        if stats.failed > 0 {
            println!("  {} {} documents failed (run with -v for details)", "✗".red(), stats.failed);
        }
        println!("  {} Index saved to: {}", "→".dimmed(), db_path.display());
    }

    Ok(())
}

fn check_model(config: &Config, json: bool) {
    let model_dir = config.model_dir();
    let model_path = model_dir.join("model.onnx");
    let tokenizer_path = model_dir.join("tokenizer.json");
    if model_path.exists() && tokenizer_path.exists() {
        return;
    }

    if json {
        println!(
            "{}",
            serde_json::json!({
                "error": "Model not found",
                "model_dir": model_dir.display().to_string(),
                "hint": "Download model.onnx and tokenizer.json first"
            })
        );
    } else {
        eprintln!(
            "{} Model files not found in: {}",
            "Error:".red().bold(),
            model_dir.display()
        );
        eprintln!();
        eprintln!("To download the model, run:");
        eprintln!("  {}", "# Download all-MiniLM-L6-v2".dimmed());
        eprintln!("  curl -L -o {} \\", model_path.display());
        eprintln!(
            "    https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx"
        );
        eprintln!("  curl -L -o {} \\", tokenizer_path.display());
        eprintln!(
            "    https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json"
        );
    }
    std::process::exit(1);
}

/// Show index status
fn show_status(db_path: &Path, json: bool) -> Result<()> {
    if !db_path.exists() {
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "exists": false,
                    "error": "Index not found"
                })
            );
        } else {
            println!(
                "{} Index not found. Run {} first.",
                "!".yellow().bold(),
                "pss index".cyan()
            );
        }
        return Ok(());
    }

    let db = VectorDB::open(db_path)?;
    let stats = db.get_stats()?;
    let file_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "exists": true,
                "document_count": stats.document_count,
                "sentence_count": stats.sentence_count,
                "embedding_count": stats.embedding_count,
                "embedder": stats.embedder,
                "last_indexed": stats.last_indexed,
                "file_size_bytes": file_size,
            })
        );
    } else {
        println!("{}", "Index Status".bold());
        println!();
        println!(
            "  {} {} documents indexed",
            "→".dimmed(),
            stats.document_count.to_string().cyan()
        );
        println!(
            "  {} {} sentences, {} embeddings",
            "→".dimmed(),
            stats.sentence_count.to_string().cyan(),
            stats.embedding_count
        );
        if let Some(ref embedder) = stats.embedder {
            println!("  {} Embedder: {}", "→".dimmed(), embedder);
        }
        println!(
            "  {} Size: {:.2} KB",
            "→".dimmed(),
            file_size as f64 / 1024.0
        );
        if let Some(ts) = stats.last_indexed {
            println!("  {} Last indexed: {}", "→".dimmed(), format_timestamp(ts));
        }
    }

    Ok(())
}

pub fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
