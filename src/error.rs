use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the extraction, indexing and search layers.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Failed to extract text from {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(PathBuf),

    #[error("Search query is empty")]
    EmptyQuery,

    #[error(
        "Index was built with embedder '{indexed}' ({indexed_dim} dims) but '{active}' ({active_dim} dims) is active. Run `pss index --rebuild`."
    )]
    EmbedderMismatch {
        indexed: String,
        indexed_dim: usize,
        active: String,
        active_dim: usize,
    },

    #[error("Embedding model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Unknown embedder '{0}' (must be: htp|onnx)")]
    UnknownEmbedder(String),

    #[error("Document not indexed: {0}")]
    DocumentNotFound(String),

    #[error("Sentence {position} not found in {doc_id}")]
    SentenceNotFound { doc_id: String, position: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Embedding failed: {0}")]
    Embedding(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
