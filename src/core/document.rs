use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use walkdir::{DirEntry, WalkDir};

use super::extract::{extract_text, DocumentKind};
use super::paths::CorpusPaths;
use super::text::{sentences, Sentence, SentenceFilter};
use crate::error::{Result, SearchError};

pub struct Document {
    pub path: PathBuf,
    pub name: String,
    pub kind: DocumentKind,
    pub text: String,
    pub size: u64,
    pub modified: DateTime<Local>,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| SearchError::UnsupportedFile(path.to_path_buf()))?;
        let metadata = fs::metadata(path)?;
        let text = extract_text(path)?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            kind,
            text,
            size: metadata.len(),
            modified: DateTime::from(metadata.modified()?),
        })
    }

    pub fn sentences(&self, filter: &SentenceFilter) -> Vec<Sentence> {
        sentences(&self.text, filter)
    }
}

/// Modification time of a file as unix seconds.
pub fn file_mtime(path: &Path) -> Result<i64> {
    let modified: DateTime<Local> = DateTime::from(fs::metadata(path)?.modified()?);
    Ok(modified.timestamp())
}

/// All supported documents under the corpus root, sorted by path.
///
/// Hidden entries (including the index data directory) are skipped.
pub fn collect_documents(paths: &CorpusPaths) -> Vec<PathBuf> {
    if !paths.root.exists() {
        return Vec::new();
    }

    let mut documents: Vec<PathBuf> = WalkDir::new(&paths.root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| DocumentKind::from_path(e.path()).is_some())
        .map(|e| e.into_path())
        .collect();

    documents.sort();
    documents
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
