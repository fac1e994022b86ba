//! Sentence embedding and similarity search
//!
//! Sentences are embedded once at index time and stored in SQLite; queries
//! are embedded with the same backend and ranked by cosine similarity.

pub mod embedding;
pub mod engine;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod vectordb;

pub use embedding::{cosine_similarity, load_embedder, Embedder, HtpEmbedder};
pub use engine::{keyword_search, SearchEngine, SearchHit, SearchOptions};
pub use vectordb::VectorDB;
