use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one batch indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files with a symbol set (fresh or cached)
    pub files: usize,

    /// Total symbols across all sets
    pub symbols: usize,

    /// Sets served from the cache
    pub cache_hits: usize,

    pub failures: usize,

    pub skipped: usize,

    /// Stale cache records removed after a project run
    pub stale_removed: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Files per language
    pub languages: BTreeMap<String, usize>,
}

impl IndexStats {
    pub fn add_file(&mut self, language: &str, symbols: usize, cached: bool) {
        self.files += 1;
        self.symbols += symbols;
        if cached {
            self.cache_hits += 1;
        }
        *self.languages.entry(language.to_string()).or_insert(0) += 1;
    }

    pub fn add_failure(&mut self) {
        self.failures += 1;
    }

    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }
}
