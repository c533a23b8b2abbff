use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory under the project root holding pipeline state
pub const CONTEXT_DIR_NAME: &str = ".context";

/// Files larger than this are never listed or indexed
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1_048_576;

pub const DEFAULT_MEMORY_CAPACITY: usize = 4096;

/// Configuration for symbol indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Cache directory; `<root>/.context/symbols` when unset
    pub cache_dir: Option<PathBuf>,

    /// Maximum entries kept in the in-memory tier
    pub memory_capacity: usize,

    /// Files processed concurrently; derived from available cores when unset
    pub max_concurrent: Option<usize>,

    /// Size limit for scanned files
    pub max_file_bytes: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            max_concurrent: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl IndexerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.memory_capacity == 0 {
            return Err(IndexerError::InvalidConfig(
                "memory_capacity must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent == Some(0) {
            return Err(IndexerError::InvalidConfig(
                "max_concurrent must be greater than 0".to_string(),
            ));
        }

        if self.max_file_bytes == 0 {
            return Err(IndexerError::InvalidConfig(
                "max_file_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Cache directory for a project rooted at `root`; relative dirs hang off the root
    pub fn resolve_cache_dir(&self, root: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join(CONTEXT_DIR_NAME).join("symbols"),
        }
    }

    /// Worker count for batch indexing
    pub fn concurrency(&self) -> usize {
        // Extraction is a mix of IO and CPU; keep fan-out small and adaptive.
        self.max_concurrent.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .clamp(2, 8)
        })
    }
}
