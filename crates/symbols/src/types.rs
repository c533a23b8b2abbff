use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// One declared code entity, represented by its signature rather than its body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedSymbol {
    /// Declared name
    pub name: String,

    /// What kind of declaration this is
    pub kind: SymbolKind,

    /// Declaration text up to the body, collapsed to one line
    pub signature: String,

    /// Defining file path
    pub file_path: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// First line of attached documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,

    /// Decorator / attribute / annotation names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,

    /// Enclosing class, impl target or function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl ExtractedSymbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        signature: impl Into<String>,
        file_path: impl Into<String>,
        start_line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            signature: signature.into(),
            file_path: file_path.into(),
            start_line,
            docstring: None,
            decorators: Vec::new(),
            parent: None,
        }
    }

    /// Builder: set docstring
    #[must_use]
    pub fn docstring(mut self, doc: Option<String>) -> Self {
        self.docstring = doc.filter(|d| !d.is_empty());
        self
    }

    /// Builder: set decorators
    #[must_use]
    pub fn decorators(mut self, decorators: Vec<String>) -> Self {
        self.decorators = decorators;
        self
    }

    /// Builder: set parent scope
    #[must_use]
    pub fn parent(mut self, parent: Option<&str>) -> Self {
        self.parent = parent.map(str::to_string);
        self
    }

    /// Qualified name, e.g. `Session.refresh`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Kind of declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Free function
    Function,
    /// Function declared inside a class, impl or trait
    Method,
    /// Class, struct, enum, trait and similar type declarations
    Class,
    /// Free `async` function
    AsyncFunction,
    /// Modules, interfaces, type aliases
    Other,
}

impl SymbolKind {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::AsyncFunction => "async_function",
            Self::Other => "other",
        }
    }

    /// Check if this symbol is callable
    #[must_use]
    pub const fn is_callable(self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::AsyncFunction)
    }
}

/// Ordered symbols of one file plus the content hash they were extracted from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSymbols {
    /// File path as the caller refers to it
    pub path: String,

    /// Language name used for extraction
    pub language: String,

    /// SHA-256 of the file content at extraction time (lowercase hex)
    pub content_hash: String,

    /// Extraction time in unix milliseconds
    pub extracted_at_ms: u64,

    /// Symbols in source order
    pub symbols: Vec<ExtractedSymbol>,
}

impl FileSymbols {
    /// Stamp a freshly extracted symbol list with its content hash and the current time
    pub fn new(
        path: impl Into<String>,
        language: impl Into<String>,
        content: &[u8],
        symbols: Vec<ExtractedSymbol>,
    ) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            content_hash: content_hash(content),
            extracted_at_ms: unix_ms_now(),
            symbols,
        }
    }

    /// Whether this set still describes content with the given hash
    #[must_use]
    pub fn is_fresh_for(&self, hash: &str) -> bool {
        self.content_hash == hash
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// SHA-256 of `bytes` as lowercase hex
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Current time in unix milliseconds
#[must_use]
pub fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable_hex() {
        let hash = content_hash(b"def f(): pass\n");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, content_hash(b"def f(): pass\n"));
        assert_ne!(hash, content_hash(b"def f(): pass \n"));
    }

    #[test]
    fn test_symbol_builder() {
        let symbol = ExtractedSymbol::new("refresh", SymbolKind::Method, "def refresh(self)", "a.py", 3)
            .parent(Some("Session"))
            .docstring(Some(String::new()))
            .decorators(vec!["staticmethod".to_string()]);

        assert_eq!(symbol.qualified_name(), "Session.refresh");
        assert_eq!(symbol.docstring, None);
        assert_eq!(symbol.decorators, vec!["staticmethod"]);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&SymbolKind::AsyncFunction).unwrap();
        assert_eq!(json, "\"async_function\"");
        assert!(SymbolKind::AsyncFunction.is_callable());
        assert!(!SymbolKind::Class.is_callable());
    }

    #[test]
    fn test_file_symbols_freshness() {
        let set = FileSymbols::new("a.py", "python", b"x = 1\n", Vec::new());
        assert!(set.is_fresh_for(&content_hash(b"x = 1\n")));
        assert!(!set.is_fresh_for(&content_hash(b"x = 2\n")));
        assert!(set.is_empty());
    }
}
