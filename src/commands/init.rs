use anyhow::Result;
use colored::*;
use std::fs;

use pdf_sentence_search::collect_documents;
use pdf_sentence_search::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let paths = config.paths();

    println!("{}", "PDF Sentence Search".bold());
    println!("{}", "=".repeat(50));
    println!();

    if !paths.root.is_dir() {
        println!(
            "{} Corpus directory not found: {}",
            "✗".red(),
            paths.root.display()
        );
        std::process::exit(1);
    }

    let mut created = 0;
    for (path, purpose) in paths.required_folders() {
        if path.exists() {
            println!("{} {} exists ({})", "✓".green(), path.display(), purpose);
        } else {
            fs::create_dir_all(path)?;
            created += 1;
            println!("{} Created {} ({})", "✓".green(), path.display(), purpose);
        }
    }
    if let Some(parent) = paths.db.parent() {
        fs::create_dir_all(parent)?;
    }

    let documents = collect_documents(&paths);

    println!();
    println!("Created: {} folders", created.to_string().green());
    println!(
        "Documents found: {}",
        documents.len().to_string().cyan()
    );
    println!();
    println!("Next: run {} to build the sentence index.", "pss index".cyan());

    Ok(())
}
