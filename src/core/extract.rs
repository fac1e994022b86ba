//! Raw text extraction from corpus files
//!
//! PDFs go through the `pdf-extract` crate. Some malformed files make the
//! PDF parser panic, so extraction runs under `catch_unwind` and a panic is
//! reported as an ordinary extraction error for that file.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SearchError};

/// Kind of document, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "text",
        }
    }
}

/// Extract the raw text of a supported file.
pub fn extract_text(path: &Path) -> Result<String> {
    match DocumentKind::from_path(path) {
        Some(DocumentKind::Pdf) => extract_pdf(path),
        Some(DocumentKind::Text) => extract_plain(path),
        None => Err(SearchError::UnsupportedFile(path.to_path_buf())),
    }
}

/// Extract all text from a PDF file.
pub fn extract_pdf(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let text = extract_pdf_bytes(&bytes).map_err(|message| SearchError::Extraction {
        path: path.to_path_buf(),
        message,
    })?;

    debug!(path = %path.display(), chars = text.len(), "Extracted PDF text");
    Ok(text)
}

/// Extract text from in-memory PDF bytes.
pub fn extract_pdf_bytes(bytes: &[u8]) -> std::result::Result<String, String> {
    if !bytes.starts_with(b"%PDF") {
        return Err("not a PDF file (missing %PDF header)".to_string());
    }

    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(format!("PDF parser panicked: {}", reason))
        }
    }
}

fn extract_plain(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
