use thiserror::Error;

/// Result type for symbol extraction
pub type Result<T> = std::result::Result<T, SymbolError>;

/// Errors that can occur while extracting symbols from one file
#[derive(Error, Debug)]
pub enum SymbolError {
    /// Source did not parse cleanly; `line` is 1-indexed
    #[error("Parse error in {path} at line {line}: {message}")]
    ParseError {
        path: String,
        line: usize,
        message: String,
    },

    /// No extractor is registered for this language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),

    /// Content is not valid UTF-8
    #[error("Invalid UTF-8 in {0}")]
    Encoding(String),
}

impl SymbolError {
    /// Create a parse error
    pub fn parse(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }

    /// True when the failure comes from the source text itself rather than the environment
    #[must_use]
    pub const fn is_parse_failure(&self) -> bool {
        matches!(self, Self::ParseError { .. } | Self::Encoding(_))
    }
}
