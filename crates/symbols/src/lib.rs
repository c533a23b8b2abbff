//! # Context Symbols
//!
//! Per-language symbol extraction: turns one file's text into the functions,
//! methods and classes it declares, represented by their signatures.
//!
//! ## Strategies
//!
//! ```text
//! path ──> ExtractorRegistry (extension → extractor)
//!              │
//!              ├──> StructuralExtractor  (tree-sitter: Python, Rust, JS, TS/TSX)
//!              │      └─> syntax errors are reported, never silently dropped
//!              │
//!              └──> PatternExtractor     (anchored line regexes: Go, Java, Kotlin,
//!                     └─> best-effort     Ruby, PHP, Swift, C#)
//!
//! FileSymbols { path, language, content_hash, extracted_at_ms, symbols[] }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_symbols::{ExtractorRegistry, SymbolKind};
//!
//! let registry = ExtractorRegistry::with_defaults();
//! let code = b"def authenticate(username: str, password: str) -> bool:\n    return True\n";
//!
//! let set = registry.extract("auth.py", code).unwrap();
//! assert_eq!(set.symbols[0].kind, SymbolKind::Function);
//! assert_eq!(
//!     set.symbols[0].signature,
//!     "def authenticate(username: str, password: str) -> bool"
//! );
//! ```

mod error;
mod extractor;
mod language;
mod pattern;
mod structural;
mod types;

pub use error::{Result, SymbolError};
pub use extractor::{ExtractorRegistry, SymbolExtractor};
pub use language::{ExtractionStrategy, Language};
pub use pattern::PatternExtractor;
pub use structural::StructuralExtractor;
pub use types::{content_hash, unix_ms_now, ExtractedSymbol, FileSymbols, SymbolKind};
