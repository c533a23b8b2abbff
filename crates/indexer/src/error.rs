use crate::indexer::IndexFailure;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Symbol extraction error: {0}")]
    SymbolError(#[from] context_symbols::SymbolError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("Cannot create cache directory {}: {source}", path.display())]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write cache record for {path}: {message}")]
    CacheWrite { path: String, message: String },

    #[error("Invalid indexer config: {0}")]
    InvalidConfig(String),

    #[error("All {} files failed to index", failures.len())]
    TotalFailure { failures: Vec<IndexFailure> },

    #[error("Indexing task failed: {0}")]
    Join(String),
}
