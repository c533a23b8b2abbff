use context_discovery::{CandidateFile, Keyword};
use context_indexer::{BatchIndex, IndexFailure, IndexStats};
use context_symbols::FileSymbols;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct DiscoverReport {
    pub task: String,
    pub keywords: Vec<Keyword>,
    pub candidates: Vec<CandidateFile>,
}

/// Ranked files for a task together with their symbol sets
#[derive(Debug, Serialize)]
pub struct GatherReport {
    pub task: String,
    pub keywords: Vec<Keyword>,
    pub candidates: Vec<CandidateFile>,
    pub symbols: BTreeMap<String, FileSymbols>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<IndexFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    pub stats: IndexStats,
}

impl GatherReport {
    pub fn new(
        task: String,
        keywords: Vec<Keyword>,
        candidates: Vec<CandidateFile>,
        batch: BatchIndex,
    ) -> Self {
        Self {
            task,
            keywords,
            candidates,
            symbols: batch.symbols,
            failures: batch.failures,
            skipped: batch.skipped,
            stats: batch.stats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StaleReport {
    pub cache_dir: String,
    pub removed: usize,
}
