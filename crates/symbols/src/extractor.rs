use crate::error::{Result, SymbolError};
use crate::language::{ExtractionStrategy, Language};
use crate::pattern::PatternExtractor;
use crate::structural::StructuralExtractor;
use crate::types::{ExtractedSymbol, FileSymbols};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Turns one file's text into its declared symbols.
///
/// Implementations must be pure functions of `(path, content)` so that cached
/// results stay interchangeable with fresh ones.
pub trait SymbolExtractor: Send + Sync {
    /// Language this extractor understands
    fn language(&self) -> Language;

    /// Extract symbols in source order. Content that cannot be parsed is an error,
    /// never an empty list.
    fn extract(&self, path: &str, content: &str) -> Result<Vec<ExtractedSymbol>>;
}

/// Extension-keyed dispatch table of extractors
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    by_extension: HashMap<String, Arc<dyn SymbolExtractor>>,
}

impl ExtractorRegistry {
    /// Registry with no extractors
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every bundled extractor
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for language in [
            Language::Python,
            Language::Rust,
            Language::JavaScript,
            Language::TypeScript,
            Language::Tsx,
        ] {
            registry.register(Arc::new(StructuralExtractor::new(language)));
        }
        for language in [
            Language::Go,
            Language::Java,
            Language::Kotlin,
            Language::Ruby,
            Language::Php,
            Language::Swift,
            Language::CSharp,
        ] {
            registry.register(Arc::new(PatternExtractor::new(language)));
        }
        registry
    }

    /// Register an extractor for every extension of its language
    pub fn register(&mut self, extractor: Arc<dyn SymbolExtractor>) {
        for ext in extractor.language().extensions() {
            self.by_extension
                .insert((*ext).to_string(), Arc::clone(&extractor));
        }
    }

    /// Register an extractor for one extra extension (without the dot)
    pub fn register_extension(&mut self, ext: &str, extractor: Arc<dyn SymbolExtractor>) {
        self.by_extension.insert(ext.to_lowercase(), extractor);
    }

    /// Extractor responsible for `path`, if any
    pub fn for_path(&self, path: impl AsRef<Path>) -> Option<&Arc<dyn SymbolExtractor>> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        self.by_extension.get(&ext)
    }

    pub fn supports(&self, path: impl AsRef<Path>) -> bool {
        self.for_path(path).is_some()
    }

    /// Number of registered extensions
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }

    /// Extract one file into a hashed, timestamped symbol set
    pub fn extract(&self, path: &str, content: &[u8]) -> Result<FileSymbols> {
        let extractor = self
            .for_path(path)
            .ok_or_else(|| SymbolError::unsupported_language(path))?;
        let language = extractor.language();

        let text = std::str::from_utf8(content).map_err(|_| SymbolError::Encoding(path.to_string()))?;
        let symbols = if text.trim().is_empty() {
            Vec::new()
        } else {
            extractor.extract(path, text)?
        };

        log::debug!(
            "Extracted {} symbols from {path} ({}, {})",
            symbols.len(),
            language.as_str(),
            match language.strategy() {
                ExtractionStrategy::Structural => "structural",
                ExtractionStrategy::Pattern => "pattern",
                ExtractionStrategy::None => "none",
            }
        );

        Ok(FileSymbols::new(path, language.as_str(), content, symbols))
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<&String> = self.by_extension.keys().collect();
        extensions.sort();
        f.debug_struct("ExtractorRegistry")
            .field("extensions", &extensions)
            .finish()
    }
}
