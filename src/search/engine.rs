//! Search Engine - combines embedding model and vector database

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::embedding::{load_embedder, tokenize, Embedder};
use super::vectordb::{DocumentRecord, IndexStats, SearchFilter, SentenceRecord, VectorDB};
use crate::config::Config;
use crate::core::document::{collect_documents, file_mtime, Document};
use crate::core::paths::CorpusPaths;
use crate::error::{Result, SearchError};

/// One ranked sentence with its source location
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub title: String,
    pub path: String,
    pub position: usize,
    pub sentence: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context_before: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context_after: Vec<String>,
}

impl From<(SentenceRecord, f32)> for SearchHit {
    fn from((record, score): (SentenceRecord, f32)) -> Self {
        Self {
            doc_id: record.doc_id,
            title: record.title,
            path: record.path,
            position: record.position,
            sentence: record.text,
            score,
            context_before: Vec::new(),
            context_after: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub min_score: Option<f32>,
    /// Restrict the search to one document id
    pub document: Option<String>,
    /// Neighbouring sentences to attach on each side of a hit
    pub context: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            min_score: None,
            document: None,
            context: 0,
        }
    }
}

/// Indexing statistics
#[derive(Debug, Default, Serialize)]
pub struct IndexingStats {
    pub indexed: usize,
    pub unchanged: usize,
    /// Documents that yielded no usable sentences
    pub skipped: usize,
    pub failed: usize,
    pub removed: usize,
    pub sentences: usize,
    pub duration_ms: u128,
}

/// Outcome of indexing one document
#[derive(Debug, PartialEq, Eq)]
pub enum IndexOutcome {
    Indexed(usize),
    Empty,
}

/// Search engine combining embedding model and vector database
pub struct SearchEngine {
    embedder: Option<Box<dyn Embedder>>,
    db: VectorDB,
    paths: CorpusPaths,
    config: Config,
}

impl SearchEngine {
    /// Create new search engine
    ///
    /// The embedder is loaded lazily on first search/index operation
    pub fn new(config: &Config) -> Result<Self> {
        let paths = config.paths();
        if let Some(parent) = paths.db.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = VectorDB::open(&paths.db)?;

        Ok(Self {
            embedder: None,
            db,
            paths,
            config: config.clone(),
        })
    }

    /// Create with in-memory database (for testing)
    pub fn new_in_memory(config: &Config) -> Result<Self> {
        Ok(Self {
            embedder: None,
            db: VectorDB::open_in_memory()?,
            paths: config.paths(),
            config: config.clone(),
        })
    }

    /// Use an already constructed embedder instead of the configured one
    pub fn with_embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn paths(&self) -> &CorpusPaths {
        &self.paths
    }

    pub fn db(&self) -> &VectorDB {
        &self.db
    }

    fn ensure_embedder(&mut self) -> Result<&dyn Embedder> {
        if self.embedder.is_none() {
            let embedder = load_embedder(self.config.embedder, &self.config.model_dir())?;
            debug!(embedder = embedder.name(), "Loaded embedder");
            self.embedder = Some(embedder);
        }

        let embedder = self
            .embedder
            .as_deref()
            .ok_or_else(|| SearchError::Embedding("embedder not loaded".to_string()))?;
        self.db.check_embedder(embedder.name(), embedder.dimension())?;
        Ok(embedder)
    }

    /// Find the sentences most similar to `query`
    pub fn search(&mut self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let embedder = self.ensure_embedder()?;
        let query_embedding = embedder.embed(query)?;

        let filter = SearchFilter {
            limit: options.limit,
            min_score: options.min_score,
            document: options.document.clone(),
            exclude: None,
        };
        let results = self.db.search(&query_embedding, &filter)?;
        debug!(query, hits = results.len(), "Semantic search");

        let mut hits: Vec<SearchHit> = results.into_iter().map(SearchHit::from).collect();
        if options.context > 0 {
            self.attach_context(&mut hits, options.context)?;
        }
        Ok(hits)
    }

    /// Sentences most similar to an already indexed sentence
    pub fn similar(&mut self, doc_id: &str, position: usize, limit: usize) -> Result<Vec<SearchHit>> {
        self.ensure_embedder()?;

        if self.db.get_document(doc_id)?.is_none() {
            return Err(SearchError::DocumentNotFound(doc_id.to_string()));
        }
        let (_, embedding) = self.db.sentence_at(doc_id, position)?.ok_or_else(|| {
            SearchError::SentenceNotFound {
                doc_id: doc_id.to_string(),
                position,
            }
        })?;

        let filter = SearchFilter {
            limit,
            exclude: Some((doc_id.to_string(), position)),
            ..Default::default()
        };
        let results = self.db.search(&embedding, &filter)?;
        Ok(results.into_iter().map(SearchHit::from).collect())
    }

    fn attach_context(&self, hits: &mut [SearchHit], window: usize) -> Result<()> {
        for hit in hits {
            let from = hit.position.saturating_sub(window);
            let to = hit.position + window;
            for neighbour in self.db.sentences_in_range(&hit.doc_id, from, to)? {
                if neighbour.position < hit.position {
                    hit.context_before.push(neighbour.text);
                } else if neighbour.position > hit.position {
                    hit.context_after.push(neighbour.text);
                }
            }
        }
        Ok(())
    }

    /// Index every document in the corpus
    ///
    /// Unchanged documents (same mtime) are skipped unless `rebuild` is set;
    /// documents that no longer exist on disk are removed from the index.
    /// A rebuild starts from an empty index, so it may switch embedders.
    pub fn index_all(&mut self, rebuild: bool) -> Result<IndexingStats> {
        let start = std::time::Instant::now();
        if rebuild {
            self.db.clear()?;
            info!("Cleared index for rebuild");
        }
        self.ensure_embedder()?;

        let files = collect_documents(&self.paths);
        info!(documents = files.len(), root = %self.paths.root.display(), "Indexing corpus");

        let known: HashMap<String, i64> = self.db.all_mtimes()?.into_iter().collect();
        let known_empty: Vec<String> = self
            .db
            .empty_documents()?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut stats = IndexingStats::default();

        for path in &files {
            let id = self.paths.relative_id(path);
            seen.insert(id.clone());

            let unchanged = !rebuild
                && match (known.get(&id), file_mtime(path)) {
                    (Some(stored), Ok(current)) => *stored == current,
                    _ => false,
                };
            if unchanged {
                stats.unchanged += 1;
                continue;
            }

            match self.index_document(path) {
                Ok(IndexOutcome::Indexed(count)) => {
                    stats.indexed += 1;
                    stats.sentences += count;
                }
                Ok(IndexOutcome::Empty) => stats.skipped += 1,
                Err(e) => {
                    warn!("Failed to index {}: {}", path.display(), e);
                    stats.failed += 1;
                }
            }
        }

        for id in known.keys().filter(|id| !seen.contains(*id)) {
            if self.db.delete_document(id)? {
                debug!(doc_id = %id, "Removed deleted document from index");
                stats.removed += 1;
            }
        }
        for id in known_empty.iter().filter(|id| !seen.contains(*id)) {
            self.db.forget_empty_document(id)?;
        }

        stats.duration_ms = start.elapsed().as_millis();

        self.db.set_meta("indexed_count", &stats.indexed.to_string())?;
        self.db.set_meta(
            "last_full_index",
            &chrono::Utc::now().timestamp().to_string(),
        )?;

        info!(
            indexed = stats.indexed,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            failed = stats.failed,
            removed = stats.removed,
            "Indexing finished"
        );
        Ok(stats)
    }

    /// Extract, split, embed and store a single document
    ///
    /// A document that yields no sentences is removed from the index and
    /// reported as `Empty`.
    pub fn index_document(&mut self, path: &Path) -> Result<IndexOutcome> {
        let document = Document::load(path)?;
        let sentences = document.sentences(&self.config.filter);
        let id = self.paths.relative_id(path);

        if sentences.is_empty() {
            self.db.delete_document(&id)?;
            self.db.mark_empty_document(&id, document.modified.timestamp())?;
            debug!(doc_id = %id, "No sentences extracted");
            return Ok(IndexOutcome::Empty);
        }

        let texts: Vec<&str> = sentences.iter().map(|s| s.text.as_str()).collect();
        let embeddings = self.ensure_embedder()?.embed_batch(&texts)?;

        let record = DocumentRecord {
            id: id.clone(),
            path: document.path.to_string_lossy().to_string(),
            title: document.name.clone(),
            kind: document.kind.as_str().to_string(),
            mtime: document.modified.timestamp(),
            sentence_count: sentences.len(),
        };
        self.db.replace_document(&record, &sentences, &embeddings)?;

        debug!(doc_id = %id, sentences = sentences.len(), "Indexed document");
        Ok(IndexOutcome::Indexed(sentences.len()))
    }

    pub fn stats(&self) -> Result<IndexStats> {
        self.db.get_stats()
    }

    pub fn db_path(&self) -> PathBuf {
        self.paths.db.clone()
    }
}

/// Keyword search over indexed sentences (no embeddings needed)
///
/// Scores each sentence by the fraction of query terms it contains as whole
/// words.
pub fn keyword_search(db: &VectorDB, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let mut query_terms = tokenize(query);
    query_terms.sort();
    query_terms.dedup();
    if query_terms.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let mut hits: Vec<SearchHit> = db
        .all_sentences()?
        .into_iter()
        .filter_map(|sentence| {
            let words: HashSet<String> = tokenize(&sentence.text).into_iter().collect();
            let matched = query_terms.iter().filter(|term| words.contains(*term)).count();

            if matched == 0 {
                return None;
            }

            let score = matched as f32 / query_terms.len() as f32;
            Some(SearchHit::from((sentence, score)))
        })
        .collect();

    // Stable sort keeps document order among equal scores
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn corpus() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("embeddings.txt"),
            "Sentence embeddings map text to dense vectors. \
             Cosine similarity compares two dense vectors. \
             Tokenizers split raw text into tokens.",
        )
        .unwrap();
        fs::write(
            dir.path().join("cooking.txt"),
            "Bake the bread for forty minutes. Let the loaf cool before slicing it.",
        )
        .unwrap();
        let config = Config {
            corpus_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        (dir, config)
    }

    #[test]
    fn test_index_and_search() {
        let (_dir, config) = corpus();
        let mut engine = SearchEngine::new_in_memory(&config).unwrap();

        let stats = engine.index_all(false).unwrap();
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.sentences, 5);
        assert_eq!(stats.failed, 0);

        let options = SearchOptions {
            limit: 3,
            ..Default::default()
        };
        let hits = engine
            .search("Cosine similarity compares two dense vectors.", &options)
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].doc_id, "embeddings.txt");
        assert_eq!(hits[0].position, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-4);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_search_with_context_and_document_filter() {
        let (_dir, config) = corpus();
        let mut engine = SearchEngine::new_in_memory(&config).unwrap();
        engine.index_all(false).unwrap();

        let options = SearchOptions {
            limit: 1,
            document: Some("embeddings.txt".to_string()),
            context: 1,
            ..Default::default()
        };
        let hits = engine.search("cosine similarity dense vectors", &options).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].position, 1);
        assert_eq!(
            hits[0].context_before,
            vec!["Sentence embeddings map text to dense vectors."]
        );
        assert_eq!(
            hits[0].context_after,
            vec!["Tokenizers split raw text into tokens."]
        );
    }

    #[test]
    fn test_empty_query_rejected() {
        let (_dir, config) = corpus();
        let mut engine = SearchEngine::new_in_memory(&config).unwrap();
        let err = engine.search("   ", &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, SearchError::EmptyQuery));
    }

    #[test]
    fn test_similar_excludes_source_sentence() {
        let (_dir, config) = corpus();
        let mut engine = SearchEngine::new_in_memory(&config).unwrap();
        engine.index_all(false).unwrap();

        let hits = engine.similar("embeddings.txt", 0, 10).unwrap();
        assert_eq!(hits.len(), 4);
        assert!(!hits
            .iter()
            .any(|h| h.doc_id == "embeddings.txt" && h.position == 0));

        assert!(matches!(
            engine.similar("missing.pdf", 0, 5),
            Err(SearchError::DocumentNotFound(_))
        ));
        assert!(matches!(
            engine.similar("embeddings.txt", 42, 5),
            Err(SearchError::SentenceNotFound { .. })
        ));
    }

    #[test]
    fn test_keyword_search() {
        let (_dir, config) = corpus();
        let mut engine = SearchEngine::new_in_memory(&config).unwrap();
        engine.index_all(false).unwrap();

        let hits = keyword_search(engine.db(), "dense vectors", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| (h.score - 1.0).abs() < f32::EPSILON));

        let hits = keyword_search(engine.db(), "bread nonsense", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_keyword_search_matches_whole_words() {
        let (_dir, config) = corpus();
        let mut engine = SearchEngine::new_in_memory(&config).unwrap();
        engine.index_all(false).unwrap();

        // "to" appears inside "tokens" and "Tokenizers", but as a word only once
        let hits = keyword_search(engine.db(), "to", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, "embeddings.txt");
        assert_eq!(hits[0].position, 0);

        // Not a valid regex, still a fine keyword query
        let hits = keyword_search(engine.db(), "dense++ (vectors", 10).unwrap();
        assert_eq!(hits.len(), 2);

        assert!(matches!(
            keyword_search(engine.db(), "?!", 10),
            Err(SearchError::EmptyQuery)
        ));
    }
}
