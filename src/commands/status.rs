use std::collections::HashMap;

use anyhow::Result;
use colored::*;
use serde::Serialize;

use super::index::format_timestamp;
use pdf_sentence_search::config::Config;
use pdf_sentence_search::core::document::{collect_documents, file_mtime};
use pdf_sentence_search::core::extract::DocumentKind;
use pdf_sentence_search::search::vectordb::VectorDB;

#[derive(Serialize)]
struct CorpusStatus {
    corpus: String,
    embedder: String,
    documents_on_disk: usize,
    kind_distribution: HashMap<String, usize>,
    indexed_documents: usize,
    indexed_sentences: usize,
    last_indexed: Option<i64>,
    /// On disk but not in the index
    pending: Vec<String>,
    /// In the index but modified since
    stale: Vec<String>,
    /// In the index but gone from disk
    missing: Vec<String>,
    /// Read at their current mtime but yielded no sentences
    no_sentences: Vec<String>,
}

#[derive(Debug, Default, PartialEq)]
struct Freshness {
    pending: Vec<String>,
    stale: Vec<String>,
    no_sentences: Vec<String>,
}

/// Compare on-disk documents `(id, mtime)` with what the index recorded
fn classify(
    on_disk: &[(String, Option<i64>)],
    indexed: &HashMap<String, i64>,
    empty: &HashMap<String, i64>,
) -> Freshness {
    let mut freshness = Freshness::default();
    for (id, mtime) in on_disk {
        match (indexed.get(id), empty.get(id)) {
            (Some(stored), _) if mtime != &Some(*stored) => freshness.stale.push(id.clone()),
            (Some(_), _) => {}
            (None, Some(stored)) if mtime == &Some(*stored) => {
                freshness.no_sentences.push(id.clone())
            }
            (None, _) => freshness.pending.push(id.clone()),
        }
    }
    freshness
}

pub fn run(config: &Config, json: bool) -> Result<()> {
    let paths = config.paths();
    let files = collect_documents(&paths);

    let mut kind_distribution: HashMap<String, usize> = HashMap::new();
    for path in &files {
        if let Some(kind) = DocumentKind::from_path(path) {
            *kind_distribution.entry(kind.as_str().to_string()).or_insert(0) += 1;
        }
    }

    let (indexed, empty, stats) = if paths.db.exists() {
        let db = VectorDB::open(&paths.db)?;
        let mtimes: HashMap<String, i64> = db.all_mtimes()?.into_iter().collect();
        let empty: HashMap<String, i64> = db.empty_documents()?.into_iter().collect();
        (mtimes, empty, Some(db.get_stats()?))
    } else {
        (HashMap::new(), HashMap::new(), None)
    };

    let on_disk: Vec<(String, Option<i64>)> = files
        .iter()
        .map(|p| (paths.relative_id(p), file_mtime(p).ok()))
        .collect();
    let freshness = classify(&on_disk, &indexed, &empty);

    let mut missing: Vec<String> = indexed
        .keys()
        .filter(|id| !on_disk.iter().any(|(disk_id, _)| disk_id == *id))
        .cloned()
        .collect();
    missing.sort();

    let status = CorpusStatus {
        corpus: paths.root.display().to_string(),
        embedder: stats
            .as_ref()
            .and_then(|s| s.embedder.clone())
            .unwrap_or_else(|| config.embedder.as_str().to_string()),
        documents_on_disk: files.len(),
        kind_distribution,
        indexed_documents: stats.as_ref().map(|s| s.document_count).unwrap_or(0),
        indexed_sentences: stats.as_ref().map(|s| s.sentence_count).unwrap_or(0),
        last_indexed: stats.as_ref().and_then(|s| s.last_indexed),
        pending: freshness.pending,
        stale: freshness.stale,
        missing,
        no_sentences: freshness.no_sentences,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }

    Ok(())
}

fn print_status(status: &CorpusStatus) {
    println!("{}", "Corpus Status".bold());
    println!("{}", "=".repeat(50));
    println!();
    println!("Corpus: {}", status.corpus);
    println!("Embedder: {}", status.embedder);
    println!();

    println!("{}", "Documents".cyan());
    println!("{}", "-".repeat(30));
    for (kind, count) in &status.kind_distribution {
        println!("   {:<12} {:>6}", kind, count);
    }
    println!("   {:<12} {:>6}", "On disk", status.documents_on_disk);
    println!("   {:<12} {:>6}", "Indexed", status.indexed_documents);
    println!("   {:<12} {:>6}", "Sentences", status.indexed_sentences);
    if let Some(ts) = status.last_indexed {
        println!("   Last indexed: {}", format_timestamp(ts));
    }
    if !status.no_sentences.is_empty() {
        println!();
        print_list("without usable sentences", &status.no_sentences);
    }

    let needs_work = !status.pending.is_empty() || !status.stale.is_empty() || !status.missing.is_empty();
    if needs_work {
        println!();
        println!("{}", "Index out of date".yellow());
        println!("{}", "-".repeat(30));
        print_list("not indexed", &status.pending);
        print_list("modified", &status.stale);
        print_list("deleted", &status.missing);
        println!();
        println!("Run {} to update.", "pss index".cyan());
    }
}

fn print_list(label: &str, ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    println!("   {} {}:", ids.len(), label);
    for id in ids.iter().take(5) {
        println!("     {}", id.dimmed());
    }
    if ids.len() > 5 {
        println!("     {}", format!("... and {} more", ids.len() - 5).dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let on_disk = vec![
            ("fresh.pdf".to_string(), Some(10)),
            ("edited.pdf".to_string(), Some(20)),
            ("new.pdf".to_string(), Some(30)),
            ("blank.pdf".to_string(), Some(40)),
            ("blank-edited.pdf".to_string(), Some(50)),
        ];
        let indexed = HashMap::from([
            ("fresh.pdf".to_string(), 10),
            ("edited.pdf".to_string(), 15),
        ]);
        let empty = HashMap::from([
            ("blank.pdf".to_string(), 40),
            ("blank-edited.pdf".to_string(), 45),
        ]);

        assert_eq!(
            classify(&on_disk, &indexed, &empty),
            Freshness {
                pending: vec!["new.pdf".to_string(), "blank-edited.pdf".to_string()],
                stale: vec!["edited.pdf".to_string()],
                no_sentences: vec!["blank.pdf".to_string()],
            }
        );
    }
}
