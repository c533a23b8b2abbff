//! # Context Indexer
//!
//! Turns a set of project files into symbol tables, memoized by a two-tier cache.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (.gitignore aware)
//!     │      └─> Candidate files
//!     │
//!     ├──> Symbol Cache (memory LRU → disk records, content-hash validated)
//!     │      └─> hit: reuse
//!     │
//!     └──> Extractor Registry (on miss)
//!            └─> FileSymbols, written back to both tiers
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use context_indexer::{IndexerConfig, SymbolIndexer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let indexer = SymbolIndexer::new("/path/to/project", IndexerConfig::default())?;
//!     let batch = indexer.index_project().await?;
//!
//!     println!("Indexed {} files, {} symbols", batch.stats.files, batch.stats.symbols);
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod error;
mod indexer;
mod scanner;
mod stats;

pub use cache::{CacheStats, SymbolCache, CACHE_SCHEMA_VERSION};
pub use config::{IndexerConfig, CONTEXT_DIR_NAME, DEFAULT_MAX_FILE_BYTES, DEFAULT_MEMORY_CAPACITY};
pub use error::{IndexerError, Result};
pub use indexer::{BatchIndex, FailureKind, IndexFailure, SymbolIndexer};
pub use scanner::{is_ignored_dir_name, relative_path, FileScanner};
pub use stats::IndexStats;
