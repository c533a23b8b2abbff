use crate::error::{DiscoveryError, Result};
use crate::keywords::KeywordTier;
use context_indexer::DEFAULT_MAX_FILE_BYTES;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Scoring weights for the file matcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    /// Keyword equals the file stem
    pub exact: f64,

    /// Keyword is a substring of the relative path
    pub path: f64,

    /// Keyword maps to a name fragment found in the path
    pub synonym: f64,

    pub domain_tier: f64,
    pub regular_tier: f64,
    pub fallback_tier: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            exact: 10.0,
            path: 5.0,
            synonym: 2.0,
            domain_tier: 1.5,
            regular_tier: 1.0,
            fallback_tier: 0.5,
        }
    }
}

impl MatchWeights {
    /// Multiplier applied to every score a keyword of `tier` produces
    pub fn tier(&self, tier: KeywordTier) -> f64 {
        match tier {
            KeywordTier::Domain => self.domain_tier,
            KeywordTier::Regular => self.regular_tier,
            KeywordTier::Fallback => self.fallback_tier,
        }
    }

    /// Validate weights
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("exact", self.exact),
            ("path", self.path),
            ("synonym", self.synonym),
            ("domain_tier", self.domain_tier),
            ("regular_tier", self.regular_tier),
            ("fallback_tier", self.fallback_tier),
        ];

        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(DiscoveryError::InvalidConfig(format!(
                    "weight {name} must be finite and non-negative, got {value}"
                )));
            }
        }

        Ok(())
    }
}

/// Configuration for file discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Result limit used when the caller does not pass one
    pub max_results: usize,

    pub weights: MatchWeights,

    /// Directory names excluded in addition to the built-in list
    pub extra_ignored_dirs: Vec<String>,

    /// Files larger than this are not listed
    pub max_file_bytes: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            weights: MatchWeights::default(),
            extra_ignored_dirs: Vec::new(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl DiscoveryConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(DiscoveryError::InvalidConfig(
                "max_results must be greater than 0".to_string(),
            ));
        }

        if self.max_file_bytes == 0 {
            return Err(DiscoveryError::InvalidConfig(
                "max_file_bytes must be greater than 0".to_string(),
            ));
        }

        if let Some(dir) = self
            .extra_ignored_dirs
            .iter()
            .find(|dir| dir.trim().is_empty() || dir.contains('/'))
        {
            return Err(DiscoveryError::InvalidConfig(format!(
                "extra_ignored_dirs entries must be plain directory names, got {dir:?}"
            )));
        }

        self.weights.validate()
    }
}
