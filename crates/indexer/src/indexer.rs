use crate::cache::SymbolCache;
use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::scanner::{relative_path, FileScanner};
use crate::stats::IndexStats;
use context_symbols::{content_hash, ExtractorRegistry, FileSymbols, SymbolError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Why a file produced no symbol set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// File could not be read
    Io,
    /// Content is not valid UTF-8
    Decode,
    /// Source did not parse
    Parse,
    /// Symbols were extracted but could not be cached
    Cache,
    /// The worker task died
    Internal,
}

impl FailureKind {
    fn of(err: &IndexerError) -> Self {
        match err {
            IndexerError::SymbolError(SymbolError::Encoding(_)) => Self::Decode,
            IndexerError::SymbolError(_) => Self::Parse,
            IndexerError::CacheWrite { .. } | IndexerError::CacheDir { .. } => Self::Cache,
            IndexerError::Join(_) => Self::Internal,
            _ => Self::Io,
        }
    }
}

/// One file that failed to index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFailure {
    /// Root-relative path
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

impl IndexFailure {
    fn new(path: impl Into<String>, err: &IndexerError) -> Self {
        Self {
            path: path.into(),
            kind: FailureKind::of(err),
            message: err.to_string(),
        }
    }
}

/// Outcome of a batch: every input path lands in exactly one of
/// `symbols`, `failures` or `skipped`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchIndex {
    /// Root-relative path -> symbols
    pub symbols: BTreeMap<String, FileSymbols>,
    pub failures: Vec<IndexFailure>,
    /// Paths with no registered extractor
    pub skipped: Vec<String>,
    pub stats: IndexStats,
}

/// Dispatches files to their extractor through the symbol cache
#[derive(Clone)]
pub struct SymbolIndexer {
    inner: Arc<Inner>,
}

struct Inner {
    root: PathBuf,
    config: IndexerConfig,
    registry: ExtractorRegistry,
    cache: SymbolCache,
}

impl SymbolIndexer {
    /// Create an indexer for `root` with every bundled extractor
    pub fn new(root: impl AsRef<Path>, config: IndexerConfig) -> Result<Self> {
        Self::with_registry(root, config, ExtractorRegistry::with_defaults())
    }

    /// Create an indexer with a custom extractor registry
    pub fn with_registry(
        root: impl AsRef<Path>,
        config: IndexerConfig,
        registry: ExtractorRegistry,
    ) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        config.validate()?;

        let root = std::path::absolute(root)?;
        let cache = SymbolCache::open(config.resolve_cache_dir(&root), config.memory_capacity)?;
        log::debug!(
            "Symbol indexer for {} (cache {})",
            root.display(),
            cache.dir().display()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                root,
                config,
                registry,
                cache,
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn cache(&self) -> &SymbolCache {
        &self.inner.cache
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.inner.registry
    }

    /// Symbols of one file; `None` when no extractor handles its extension.
    ///
    /// Relative paths are resolved against the project root.
    pub fn index_file(&self, path: impl AsRef<Path>) -> Result<Option<FileSymbols>> {
        Ok(self.index_one(path.as_ref())?.map(|(symbols, _)| symbols))
    }

    /// Index `paths` on a bounded worker pool.
    ///
    /// Per-file problems are collected in [`BatchIndex::failures`]; only a batch
    /// where every attempted file failed is an error.
    pub async fn batch_index<P: AsRef<Path>>(&self, paths: &[P]) -> Result<BatchIndex> {
        let started = Instant::now();
        let mut batch = BatchIndex::default();
        if paths.is_empty() {
            return Ok(batch);
        }

        // One task per file, however many spellings of its path were passed
        let mut seen = HashSet::new();
        let unique: Vec<PathBuf> = paths
            .iter()
            .map(|path| self.resolve(path.as_ref()))
            .filter(|path| seen.insert(self.display_path(path)))
            .collect();
        if unique.len() < paths.len() {
            log::debug!("Dropped {} duplicate paths", paths.len() - unique.len());
        }

        let max_concurrent = self.inner.config.concurrency();
        for chunk in unique.chunks(max_concurrent) {
            let mut tasks = Vec::with_capacity(chunk.len());
            for path in chunk {
                let path = path.clone();
                let indexer = self.clone();
                let task_path = path.clone();
                let task = tokio::task::spawn_blocking(move || indexer.index_one(&task_path));
                tasks.push((path, task));
            }

            for (path, task) in tasks {
                let display = self.display_path(&path);
                let outcome = task
                    .await
                    .map_err(|e| IndexerError::Join(e.to_string()))
                    .and_then(|result| result);

                match outcome {
                    Ok(Some((symbols, cached))) => {
                        batch.stats.add_file(&symbols.language, symbols.len(), cached);
                        batch.symbols.insert(display, symbols);
                    }
                    Ok(None) => {
                        log::debug!("Skipping {display}: no extractor");
                        batch.stats.add_skipped();
                        batch.skipped.push(display);
                    }
                    Err(e) => {
                        log::warn!("Failed to index {display}: {e}");
                        batch.stats.add_failure();
                        batch.failures.push(IndexFailure::new(display, &e));
                    }
                }
            }
        }

        batch.stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!(
            "Indexed {} files ({} symbols, {} cached, {} failed, {} skipped) in {}ms",
            batch.stats.files,
            batch.stats.symbols,
            batch.stats.cache_hits,
            batch.stats.failures,
            batch.stats.skipped,
            batch.stats.time_ms
        );

        if !batch.failures.is_empty() && batch.symbols.is_empty() {
            return Err(IndexerError::TotalFailure {
                failures: batch.failures,
            });
        }
        Ok(batch)
    }

    /// Scan the project, index every supported file, then drop cache records
    /// for files that no longer exist
    pub async fn index_project(&self) -> Result<BatchIndex> {
        let files = self.scan_supported().await?;
        let mut batch = self.batch_index(&files).await?;
        batch.stats.stale_removed = self.clear_stale_for(files).await?;
        Ok(batch)
    }

    /// Remove cache records for files no longer present in the project
    pub async fn clear_stale(&self) -> Result<usize> {
        let files = self.scan_supported().await?;
        self.clear_stale_for(files).await
    }

    async fn scan_supported(&self) -> Result<Vec<PathBuf>> {
        let indexer = self.clone();
        tokio::task::spawn_blocking(move || {
            FileScanner::new(&indexer.inner.root)
                .max_file_bytes(indexer.inner.config.max_file_bytes)
                .scan()
                .into_iter()
                .filter(|path| indexer.inner.registry.supports(path))
                .collect()
        })
        .await
        .map_err(|e| IndexerError::Join(e.to_string()))
    }

    async fn clear_stale_for(&self, known: Vec<PathBuf>) -> Result<usize> {
        let indexer = self.clone();
        tokio::task::spawn_blocking(move || indexer.inner.cache.clear_stale(&known))
            .await
            .map_err(|e| IndexerError::Join(e.to_string()))?
    }

    /// Read once, hash, consult the cache, extract on a miss.
    /// The flag reports whether the set came from the cache.
    fn index_one(&self, path: &Path) -> Result<Option<(FileSymbols, bool)>> {
        let absolute = self.resolve(path);
        if !self.inner.registry.supports(&absolute) {
            return Ok(None);
        }

        let bytes = std::fs::read(&absolute)?;
        let hash = content_hash(&bytes);
        if let Some(cached) = self.inner.cache.lookup(&absolute, &hash) {
            return Ok(Some((cached, true)));
        }

        let display = self.display_path(&absolute);
        let symbols = self.inner.registry.extract(&display, &bytes)?;
        self.inner
            .cache
            .put(&absolute, &symbols)
            .map_err(|e| IndexerError::CacheWrite {
                path: display,
                message: e.to_string(),
            })?;
        Ok(Some((symbols, false)))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.inner.root.join(path)
        }
    }

    fn display_path(&self, path: &Path) -> String {
        relative_path(&self.inner.root, &self.resolve(path))
    }
}

impl std::fmt::Debug for SymbolIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolIndexer")
            .field("root", &self.inner.root)
            .field("cache", &self.inner.cache)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        let io = IndexerError::IoError(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(FailureKind::of(&io), FailureKind::Io);

        let decode = IndexerError::SymbolError(SymbolError::Encoding("a.py".into()));
        assert_eq!(FailureKind::of(&decode), FailureKind::Decode);

        let parse = IndexerError::SymbolError(SymbolError::parse("a.py", 3, "unexpected syntax"));
        assert_eq!(FailureKind::of(&parse), FailureKind::Parse);

        let cache = IndexerError::CacheWrite {
            path: "a.py".into(),
            message: "disk full".into(),
        };
        assert_eq!(FailureKind::of(&cache), FailureKind::Cache);
    }

    #[test]
    fn test_failure_serializes_snake_case() {
        let failure = IndexFailure {
            path: "src/a.py".into(),
            kind: FailureKind::Parse,
            message: "bad".into(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "parse");
    }
}
