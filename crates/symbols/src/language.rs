use crate::error::{Result, SymbolError};
use std::path::Path;

/// Supported programming language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Java,
    Kotlin,
    Ruby,
    Php,
    Swift,
    CSharp,
    Unknown,
}

/// How symbols are pulled out of a language's source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Bundled tree-sitter grammar, exact
    Structural,
    /// Anchored line patterns, best-effort
    Pattern,
    /// Nothing to extract
    None,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" | "pyi" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "mts" | "cts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "go" => Language::Go,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "cs" => Language::CSharp,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::CSharp => "csharp",
            Language::Unknown => "unknown",
        }
    }

    /// File extensions that map to this language
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["rs"],
            Language::Python => &["py", "pyw", "pyi"],
            Language::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Language::TypeScript => &["ts", "mts", "cts"],
            Language::Tsx => &["tsx"],
            Language::Go => &["go"],
            Language::Java => &["java"],
            Language::Kotlin => &["kt", "kts"],
            Language::Ruby => &["rb"],
            Language::Php => &["php"],
            Language::Swift => &["swift"],
            Language::CSharp => &["cs"],
            Language::Unknown => &[],
        }
    }

    /// Which extraction strategy applies to this language
    pub fn strategy(self) -> ExtractionStrategy {
        match self {
            Language::Rust
            | Language::Python
            | Language::JavaScript
            | Language::TypeScript
            | Language::Tsx => ExtractionStrategy::Structural,
            Language::Go
            | Language::Java
            | Language::Kotlin
            | Language::Ruby
            | Language::Php
            | Language::Swift
            | Language::CSharp => ExtractionStrategy::Pattern,
            Language::Unknown => ExtractionStrategy::None,
        }
    }

    /// Check if this language is parsed with a syntax tree
    pub fn supports_ast(self) -> bool {
        self.strategy() == ExtractionStrategy::Structural
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Language::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Tsx => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
            _ => Err(SymbolError::unsupported_language(self.as_str())),
        }
    }

    /// Line prefixes that start a comment in this language
    pub fn comment_prefixes(self) -> &'static [&'static str] {
        match self {
            Language::Rust
            | Language::JavaScript
            | Language::TypeScript
            | Language::Tsx
            | Language::Go
            | Language::Java
            | Language::Kotlin
            | Language::Swift
            | Language::CSharp => &["///", "//", "/**", "/*"],
            Language::Php => &["//", "/**", "/*", "#"],
            Language::Python | Language::Ruby => &["#"],
            Language::Unknown => &[],
        }
    }
}
