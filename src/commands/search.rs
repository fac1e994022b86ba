//! Grep command - keyword search over indexed sentences

use anyhow::Result;
use colored::*;

use super::semantic_search::print_hits;
use pdf_sentence_search::config::Config;
use pdf_sentence_search::search::engine::{keyword_search, SearchHit};
use pdf_sentence_search::search::vectordb::VectorDB;

const DEFAULT_LIMIT: usize = 20;

pub fn run(config: &Config, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let db_path = config.paths().db;
    if !db_path.exists() {
        eprintln!(
            "{} Index not found. Run {} first.",
            "!".yellow().bold(),
            "pss index".cyan()
        );
        std::process::exit(1);
    }

    let db = VectorDB::open(&db_path)?;
    let hits = find(&db, query, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        print_hits(query, &hits);
    }
    Ok(())
}

/// Sentences containing the query's words, best coverage first
fn find(db: &VectorDB, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>> {
    Ok(keyword_search(db, query, limit.unwrap_or(DEFAULT_LIMIT))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_sentence_search::{SearchEngine, SearchError};

    fn indexed_corpus() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("langs.txt"),
            "Rust and C++ both compile to native code. \
             Python is interpreted by default. \
             Native code starts quickly.",
        )
        .unwrap();
        let config = Config {
            corpus_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        SearchEngine::new(&config).unwrap().index_all(false).unwrap();
        (dir, config)
    }

    #[test]
    fn test_grep_reads_indexed_sentences() {
        let (_dir, config) = indexed_corpus();
        let db = VectorDB::open(&config.paths().db).unwrap();

        let hits = find(&db, "native code", None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, "langs.txt");
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 2);

        let hits = find(&db, "native", Some(1)).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_grep_accepts_regex_metacharacters() {
        let (_dir, config) = indexed_corpus();
        let db = VectorDB::open(&config.paths().db).unwrap();

        let hits = find(&db, "c++", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sentence, "Rust and C++ both compile to native code.");

        let err = find(&db, "++", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SearchError>(),
            Some(SearchError::EmptyQuery)
        ));
    }
}
