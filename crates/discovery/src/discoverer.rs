use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::keywords::{Keyword, KeywordExtractor};
use crate::matcher::{CandidateFile, FileMatcher};
use crate::synonyms::SynonymTable;
use context_indexer::FileScanner;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Proposes project files relevant to a task description
#[derive(Debug, Clone)]
pub struct FileDiscoverer {
    root: PathBuf,
    config: DiscoveryConfig,
    extractor: KeywordExtractor,
    matcher: FileMatcher,
}

impl FileDiscoverer {
    /// Create a discoverer for the project at `root`
    pub fn new(root: impl AsRef<Path>, config: DiscoveryConfig) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(DiscoveryError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        config.validate()?;

        let matcher = FileMatcher::new(config.weights.clone())
            .ignore_dirs(config.extra_ignored_dirs.iter());

        Ok(Self {
            root: root.to_path_buf(),
            config,
            extractor: KeywordExtractor::new(),
            matcher,
        })
    }

    /// Replace the built-in synonym table
    #[must_use]
    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.matcher = self.matcher.with_synonyms(synonyms);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Keywords the task would be matched with
    pub fn keywords(&self, task: &str) -> Vec<Keyword> {
        self.extractor.extract(task)
    }

    /// Rank project files for `task`, at most `max_results` of them.
    ///
    /// The project is listed afresh on every call.
    pub fn discover(&self, task: &str, max_results: usize) -> Vec<CandidateFile> {
        let start = Instant::now();
        let keywords = self.extractor.extract(task);
        let listing = FileScanner::new(&self.root)
            .max_file_bytes(self.config.max_file_bytes)
            .ignore_dirs(self.config.extra_ignored_dirs.iter())
            .scan_relative();

        let candidates = self.matcher.match_files(&keywords, &listing, max_results);
        log::debug!(
            "Discovered {} of {} files for {} keywords in {} ms",
            candidates.len(),
            listing.len(),
            keywords.len(),
            start.elapsed().as_millis()
        );
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_rejected() {
        let temp = TempDir::new().unwrap();
        let err = FileDiscoverer::new(temp.path().join("absent"), DiscoveryConfig::default())
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidPath(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp = TempDir::new().unwrap();
        let config = DiscoveryConfig {
            max_results: 0,
            ..Default::default()
        };
        let err = FileDiscoverer::new(temp.path(), config).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidConfig(_)));
    }

    #[test]
    fn test_listing_is_fresh_each_call() {
        let temp = TempDir::new().unwrap();
        let discoverer = FileDiscoverer::new(temp.path(), DiscoveryConfig::default()).unwrap();
        assert!(discoverer.discover("payment flow", 10).is_empty());

        std::fs::write(temp.path().join("payment.py"), "def pay():\n    pass\n").unwrap();
        let found = discoverer.discover("payment flow", 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "payment.py");
    }

    #[test]
    fn test_custom_synonyms_replace_builtin_table() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("ledger.py"), "x = 1\n").unwrap();
        std::fs::write(temp.path().join("session.py"), "x = 1\n").unwrap();

        let mut table = SynonymTable::empty();
        table.insert("payment", "ledger");
        let discoverer = FileDiscoverer::new(temp.path(), DiscoveryConfig::default())
            .unwrap()
            .with_synonyms(table);
        assert_eq!(discoverer.root(), temp.path());
        assert_eq!(discoverer.config().max_results, DiscoveryConfig::default().max_results);

        let found: Vec<String> = discoverer
            .discover("payment", 10)
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(found, vec!["ledger.py".to_string()]);
        // The built-in identity group is gone
        assert!(discoverer.discover("login", 10).is_empty());
    }
}
