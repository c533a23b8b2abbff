use anyhow::{Context, Result};
use context_discovery::DiscoveryConfig;
use context_indexer::{IndexerConfig, CONTEXT_DIR_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "pipeline.toml";

/// Settings for the whole pipeline, read from `<root>/.context/pipeline.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub discovery: DiscoveryConfig,
    pub indexer: IndexerConfig,
}

impl PipelineConfig {
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(CONTEXT_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Load the project's config file, falling back to defaults when absent
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path_for(root);
        if !path.is_file() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("Invalid TOML in {}", path.display()))?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.discovery
            .validate()
            .context("Invalid [discovery] settings")?;
        self.indexer.validate().context("Invalid [indexer] settings")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_config(root: &Path, body: &str) {
        let path = PipelineConfig::path_for(root);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        assert_eq!(PipelineConfig::load(temp.path()).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            r#"
[discovery]
max_results = 5
extra_ignored_dirs = ["fixtures"]

[discovery.weights]
synonym = 3.5

[indexer]
max_concurrent = 2
"#,
        );

        let config = PipelineConfig::load(temp.path()).unwrap();
        assert_eq!(config.discovery.max_results, 5);
        assert_eq!(config.discovery.extra_ignored_dirs, vec!["fixtures".to_string()]);
        assert_eq!(config.discovery.weights.synonym, 3.5);
        assert_eq!(config.discovery.weights.exact, 10.0);
        assert_eq!(config.indexer.max_concurrent, Some(2));
        assert_eq!(config.indexer.memory_capacity, IndexerConfig::default().memory_capacity);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[discovery.weights]\npath = -2.0\n");
        assert!(PipelineConfig::load(temp.path()).is_err());

        write_config(temp.path(), "[indexer\n");
        assert!(PipelineConfig::load(temp.path()).is_err());
    }
}
