use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::core::paths::CorpusPaths;
use crate::core::text::SentenceFilter;
use crate::error::SearchError;

/// Which embedding backend turns sentences into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    /// Harmonic Token Projection: deterministic, no model files needed
    Htp,
    /// Local sentence-transformer via ONNX Runtime (requires the `onnx` feature)
    Onnx,
}

impl EmbedderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Htp => "htp",
            Self::Onnx => "onnx",
        }
    }
}

impl FromStr for EmbedderKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "htp" => Ok(Self::Htp),
            "onnx" => Ok(Self::Onnx),
            other => Err(SearchError::UnknownEmbedder(other.to_string())),
        }
    }
}

/// Runtime configuration loaded from environment variables.
///
/// A `.env` file in the working directory is loaded first (see `main`).
/// Command-line flags override individual fields after loading.
#[derive(Debug, Clone)]
pub struct Config {
    pub corpus_dir: PathBuf,
    pub embedder: EmbedderKind,
    /// Directory holding `model.onnx` and `tokenizer.json`; defaults to the
    /// corpus data directory when unset
    pub model_dir: Option<PathBuf>,
    pub filter: SentenceFilter,
    pub default_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        let corpus_dir = match env::var("PSS_CORPUS_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => env::current_dir().context("Failed to get current directory")?,
        };

        let embedder = match env::var("PSS_EMBEDDER") {
            Ok(value) if !value.is_empty() => value.parse()?,
            _ => EmbedderKind::Htp,
        };

        let defaults = SentenceFilter::default();

        Ok(Self {
            corpus_dir,
            embedder,
            model_dir: env::var("PSS_MODEL_DIR").ok().map(PathBuf::from),
            filter: SentenceFilter {
                min_words: parse_env("PSS_MIN_WORDS", defaults.min_words)?,
                max_chars: parse_env("PSS_MAX_CHARS", defaults.max_chars)?,
            },
            default_limit: parse_env("PSS_DEFAULT_LIMIT", 5)?,
        })
    }

    pub fn paths(&self) -> CorpusPaths {
        CorpusPaths::from_root(self.corpus_dir.clone())
    }

    /// Effective model directory (explicit setting or `<data>/models`).
    pub fn model_dir(&self) -> PathBuf {
        self.model_dir
            .clone()
            .unwrap_or_else(|| self.paths().models)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("."),
            embedder: EmbedderKind::Htp,
            model_dir: None,
            filter: SentenceFilter::default(),
            default_limit: 5,
        }
    }
}

fn parse_env(key: &str, default: usize) -> Result<usize> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, value)),
        _ => Ok(default),
    }
}
