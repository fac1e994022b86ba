use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use pdf_sentence_search::search::embedding::Embedder;
use pdf_sentence_search::search::engine::IndexOutcome;
use pdf_sentence_search::{Config, SearchEngine, SearchError, SearchOptions};

fn write_doc(root: &Path, name: &str, text: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, text).unwrap();
}

fn set_mtime(path: &Path, secs_ago: u64) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
        .unwrap();
}

fn config_for(root: &Path) -> Config {
    Config {
        corpus_dir: root.to_path_buf(),
        ..Default::default()
    }
}

fn seed(root: &Path) {
    write_doc(
        root,
        "papers/retrieval.txt",
        "Dense retrieval encodes queries and passages into vectors. \
         Nearest neighbour search returns the closest passages. \
         Recall improves when the encoder is fine-tuned.",
    );
    write_doc(
        root,
        "garden.txt",
        "Tomatoes need plenty of sunlight every day. Water the plants early in the morning.",
    );
    write_doc(root, "blank.txt", "Hi.");
}

#[test]
fn test_incremental_indexing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    seed(root);
    let config = config_for(root);

    let mut engine = SearchEngine::new(&config).unwrap();
    let first = engine.index_all(false).unwrap();
    assert_eq!(first.indexed, 2);
    assert_eq!(first.skipped, 1, "blank.txt has no sentence of 3+ words");
    assert_eq!(first.sentences, 5);

    let second = engine.index_all(false).unwrap();
    assert_eq!(second.indexed, 0);
    assert_eq!(second.unchanged, 2);

    // Modify one file, delete another
    write_doc(
        root,
        "garden.txt",
        "Peppers prefer warm soil and steady watering.",
    );
    set_mtime(&root.join("garden.txt"), 3600);
    fs::remove_file(root.join("papers/retrieval.txt")).unwrap();

    let third = engine.index_all(false).unwrap();
    assert_eq!(third.indexed, 1);
    assert_eq!(third.removed, 1);

    let stats = engine.stats().unwrap();
    assert_eq!(stats.document_count, 1);
    assert_eq!(stats.sentence_count, 1);
    assert_eq!(stats.embedding_count, 1);
    assert_eq!(stats.embedder.as_deref(), Some("htp"));
}

#[test]
fn test_rebuild_reindexes_everything() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let config = config_for(dir.path());

    let mut engine = SearchEngine::new_in_memory(&config).unwrap();
    engine.index_all(false).unwrap();
    let rebuilt = engine.index_all(true).unwrap();
    assert_eq!(rebuilt.indexed, 2);
    assert_eq!(rebuilt.unchanged, 0);
}

#[test]
fn test_index_persists_across_engines() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let config = config_for(dir.path());

    {
        let mut engine = SearchEngine::new(&config).unwrap();
        engine.index_all(false).unwrap();
    }

    let mut engine = SearchEngine::new(&config).unwrap();
    let options = SearchOptions {
        limit: 2,
        ..Default::default()
    };
    let hits = engine
        .search("nearest neighbour search returns the closest passages", &options)
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].doc_id, "papers/retrieval.txt");
    assert_eq!(hits[0].position, 1);
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn test_min_score_can_filter_everything() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let config = config_for(dir.path());

    let mut engine = SearchEngine::new_in_memory(&config).unwrap();
    engine.index_all(false).unwrap();

    let options = SearchOptions {
        limit: 10,
        min_score: Some(1.01),
        ..Default::default()
    };
    assert!(engine.search("tomatoes", &options).unwrap().is_empty());
}

#[test]
fn test_unreadable_pdf_counts_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    write_doc(dir.path(), "broken.pdf", "this is not a pdf");
    let config = config_for(dir.path());

    let mut engine = SearchEngine::new_in_memory(&config).unwrap();
    let stats = engine.index_all(false).unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.indexed, 2);

    let err = engine.index_document(&dir.path().join("broken.pdf")).unwrap_err();
    assert!(matches!(err, SearchError::Extraction { .. }));
}

#[test]
fn test_index_document_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let config = config_for(dir.path());

    let mut engine = SearchEngine::new_in_memory(&config).unwrap();
    assert_eq!(
        engine.index_document(&dir.path().join("garden.txt")).unwrap(),
        IndexOutcome::Indexed(2)
    );
    assert_eq!(
        engine.index_document(&dir.path().join("blank.txt")).unwrap(),
        IndexOutcome::Empty
    );
}

/// Three-dimensional embedder that counts vowels, for mismatch checks
struct VowelEmbedder;

impl Embedder for VowelEmbedder {
    fn name(&self) -> &str {
        "vowels"
    }

    fn dimension(&self) -> usize {
        3
    }

    fn embed(&self, text: &str) -> pdf_sentence_search::error::Result<Vec<f32>> {
        let count = |c: char| text.chars().filter(|x| x.eq_ignore_ascii_case(&c)).count() as f32;
        Ok(vec![count('a'), count('e'), count('o')])
    }
}

#[test]
fn test_embedder_mismatch_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let config = config_for(dir.path());

    let mut engine = SearchEngine::new(&config).unwrap();
    engine.index_all(false).unwrap();
    drop(engine);

    let mut engine = SearchEngine::new(&config)
        .unwrap()
        .with_embedder(Box::new(VowelEmbedder));
    let err = engine
        .search("water the plants", &SearchOptions::default())
        .unwrap_err();
    assert!(matches!(err, SearchError::EmbedderMismatch { .. }));

    let err = engine.index_all(false).unwrap_err();
    assert!(matches!(err, SearchError::EmbedderMismatch { .. }));

    let rebuilt = engine.index_all(true).unwrap();
    assert_eq!(rebuilt.indexed, 2);
    let stats = engine.stats().unwrap();
    assert_eq!(stats.embedder.as_deref(), Some("vowels"));
    assert_eq!(stats.sentence_count, 5);

    let hits = engine
        .search("water the plants", &SearchOptions::default())
        .unwrap();
    assert_eq!(hits.len(), 5);
}

#[test]
fn test_files_without_sentences_are_remembered() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let config = config_for(dir.path());

    let mut engine = SearchEngine::new_in_memory(&config).unwrap();
    engine.index_all(false).unwrap();
    let empty = engine.db().empty_documents().unwrap();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].0, "blank.txt");

    // Gains a real sentence
    write_doc(dir.path(), "blank.txt", "Now this file has content.");
    set_mtime(&dir.path().join("blank.txt"), 7200);
    let stats = engine.index_all(false).unwrap();
    assert_eq!(stats.skipped, 0);
    assert!(engine.db().empty_documents().unwrap().is_empty());

    // Emptied again, then deleted
    write_doc(dir.path(), "blank.txt", "Gone.");
    engine.index_all(false).unwrap();
    assert_eq!(engine.db().empty_documents().unwrap().len(), 1);
    assert!(engine.db().get_document("blank.txt").unwrap().is_none());

    fs::remove_file(dir.path().join("blank.txt")).unwrap();
    engine.index_all(false).unwrap();
    assert!(engine.db().empty_documents().unwrap().is_empty());
}
