use std::path::{Path, PathBuf};

/// Name of the hidden directory that holds the index inside a corpus.
pub const DATA_DIR_NAME: &str = ".pdfsearch";

pub struct CorpusPaths {
    pub root: PathBuf,
    pub data: PathBuf,
    pub db: PathBuf,
    pub models: PathBuf,
}

impl CorpusPaths {
    pub fn new() -> Self {
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_root(root)
    }

    pub fn from_root(root: PathBuf) -> Self {
        let data = root.join(DATA_DIR_NAME);
        Self {
            db: data.join("data/index.db"),
            models: data.join("models"),
            data,
            root,
        }
    }

    pub fn required_folders(&self) -> Vec<(&Path, &str)> {
        vec![
            (self.data.as_path(), "Index data"),
            (self.models.as_path(), "Embedding models (onnx backend)"),
        ]
    }

    /// Stable document id: path relative to the corpus root with `/` separators.
    pub fn relative_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Default for CorpusPaths {
    fn default() -> Self {
        Self::new()
    }
}
