//! pdf-sentence-search library
//!
//! Scrapes text from a corpus of PDF files, embeds the sentences in the text
//! and finds sentences semantically similar to a search query.
//!
//! # Modules
//!
//! - `core`: Corpus discovery, PDF text extraction, sentence splitting
//! - `search`: Embedding backends, SQLite vector store, search engine
//! - `mcp`: MCP server exposing corpus search to AI assistants

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod search;

// Re-exports for convenience
pub use crate::config::{Config, EmbedderKind};
pub use crate::core::document::{collect_documents, Document};
pub use crate::core::paths::CorpusPaths;
pub use crate::core::text::{clean_text, sentences, split_sentences, Sentence, SentenceFilter};
pub use crate::error::SearchError;
pub use crate::search::{SearchEngine, SearchHit, SearchOptions};
