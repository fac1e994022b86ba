use anyhow::Result;
use colored::*;

use super::index::format_timestamp;
use pdf_sentence_search::config::Config;
use pdf_sentence_search::search::vectordb::VectorDB;

pub fn run(config: &Config, json: bool) -> Result<()> {
    let db_path = config.paths().db;
    if !db_path.exists() {
        if json {
            println!("[]");
        } else {
            println!(
                "{} Index not found. Run {} first.",
                "!".yellow().bold(),
                "pss index".cyan()
            );
        }
        return Ok(());
    }

    let db = VectorDB::open(&db_path)?;
    let documents = db.list_documents()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    println!("{} ({})", "Indexed Documents".bold(), documents.len());
    println!("{}", "=".repeat(60));
    for doc in &documents {
        println!(
            "  {:<48} {:>6} sentences  {}",
            doc.id.cyan(),
            doc.sentence_count,
            format_timestamp(doc.mtime).dimmed()
        );
    }

    Ok(())
}
