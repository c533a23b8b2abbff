//! Syntax-tree extraction for languages with a bundled tree-sitter grammar.
//!
//! Every well-formed declaration is reported; a tree containing error or
//! missing nodes is rejected as a whole with the line of the first error.

mod javascript;
mod python;
mod rust;

use crate::error::{Result, SymbolError};
use crate::extractor::SymbolExtractor;
use crate::language::Language;
use crate::types::ExtractedSymbol;
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter backed extractor for one language
#[derive(Debug, Clone, Copy)]
pub struct StructuralExtractor {
    language: Language,
}

impl StructuralExtractor {
    /// Create an extractor; `language` must support AST parsing
    #[must_use]
    pub const fn new(language: Language) -> Self {
        Self { language }
    }

    fn parse(&self, content: &str) -> Result<Tree> {
        let ts_language = self.language.tree_sitter_language()?;
        // Parsers are cheap and not Sync; one per call keeps the extractor shareable.
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| SymbolError::tree_sitter(format!("Failed to set language: {e}")))?;

        parser
            .parse(content, None)
            .ok_or_else(|| SymbolError::tree_sitter("Parser returned no tree"))
    }
}

impl SymbolExtractor for StructuralExtractor {
    fn language(&self) -> Language {
        self.language
    }

    fn extract(&self, path: &str, content: &str) -> Result<Vec<ExtractedSymbol>> {
        if !self.language.supports_ast() {
            return Err(SymbolError::unsupported_language(self.language.as_str()));
        }

        let tree = self.parse(content)?;
        let root = tree.root_node();

        if root.has_error() {
            let (line, message) = match first_error(root) {
                Some(node) if node.is_missing() => {
                    (line_of(node), format!("missing `{}`", node.kind()))
                }
                Some(node) => (line_of(node), "unexpected syntax".to_string()),
                None => (1, "unexpected syntax".to_string()),
            };
            return Err(SymbolError::parse(path, line, message));
        }

        let src = Source {
            path,
            text: content,
        };
        let mut symbols = Vec::new();

        match self.language {
            Language::Python => python::collect(&src, root, &mut symbols),
            Language::Rust => rust::collect(&src, root, &mut symbols),
            Language::JavaScript | Language::TypeScript | Language::Tsx => {
                javascript::collect(&src, root, &mut symbols);
            }
            _ => {}
        }

        Ok(symbols)
    }
}

/// Source text of the file being walked
pub(crate) struct Source<'a> {
    pub path: &'a str,
    pub text: &'a str,
}

impl<'a> Source<'a> {
    /// Raw text of a node
    fn text(&self, node: Node) -> &'a str {
        self.text.get(node.byte_range()).unwrap_or("")
    }

    /// Text between two byte offsets, collapsed to one line
    fn span(&self, start: usize, end: usize) -> String {
        collapse_whitespace(self.text.get(start..end).unwrap_or(""))
    }
}

/// Collapse every whitespace run into a single space
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First non-empty line of a comment/docstring body
pub(crate) fn first_doc_line(text: &str) -> Option<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches("/**")
                .trim_start_matches("/*")
                .trim_end_matches("*/")
                .trim_start_matches('*')
                .trim()
        })
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Name part of a decorator/attribute: `@app.route("/")` -> `app.route`
pub(crate) fn decorator_name(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_start_matches('@')
        .trim_start_matches("#[")
        .trim_end_matches(']');
    trimmed
        .split(|c: char| c == '(' || c == '=' || c.is_whitespace())
        .next()
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

/// Deepest-first error or missing node, found without recursion
fn first_error(root: Node) -> Option<Node> {
    let mut node = root;
    'descend: loop {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.has_error() || child.is_missing() {
                node = child;
                continue 'descend;
            }
        }
        return None;
    }
}

/// A node waiting to be visited by a declaration walker
pub(crate) struct Pending<'t, 'a> {
    pub node: Node<'t>,
    /// Node carrying leading comments and decorators; usually `node` itself
    pub outer: Node<'t>,
    pub parent: Option<&'a str>,
    /// Inside a class, impl or trait body
    pub members: bool,
}

/// Queue the named children of `node` so they pop in source order.
///
/// Walkers drain an explicit stack instead of recursing, so nesting depth
/// is bounded by memory rather than by the thread stack.
pub(crate) fn push_children<'t, 'a>(
    stack: &mut Vec<Pending<'t, 'a>>,
    node: Node<'t>,
    parent: Option<&'a str>,
    members: bool,
) {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    stack.extend(children.into_iter().rev().map(|child| Pending {
        node: child,
        outer: child,
        parent,
        members,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymbolKind;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("def f(\n    a: int,\n    b: str,\n)"),
            "def f( a: int, b: str, )"
        );
    }

    #[test]
    fn test_first_doc_line() {
        assert_eq!(
            first_doc_line("/**\n * Loads the user.\n * @param id\n */").as_deref(),
            Some("Loads the user.")
        );
        assert_eq!(first_doc_line("   \n  "), None);
    }

    #[test]
    fn test_decorator_name() {
        assert_eq!(decorator_name("@app.route(\"/login\")"), "app.route");
        assert_eq!(decorator_name("#[derive(Debug, Clone)]"), "derive");
        assert_eq!(decorator_name("#[tokio::test]"), "tokio::test");
        assert_eq!(decorator_name("@staticmethod"), "staticmethod");
    }

    #[test]
    fn test_broken_syntax_is_a_failure_with_line() {
        let extractor = StructuralExtractor::new(Language::Python);
        let err = extractor
            .extract("broken.py", "def ok():\n    pass\n\ndef broken(:\n    pass\n")
            .unwrap_err();
        match err {
            SymbolError::ParseError { path, line, .. } => {
                assert_eq!(path, "broken.py");
                assert!((1..=5).contains(&line), "error reported at line {line}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_pattern_language_rejected() {
        let extractor = StructuralExtractor::new(Language::Go);
        assert!(extractor.extract("main.go", "package main").is_err());
    }

    #[test]
    fn test_idempotent_extraction() {
        let extractor = StructuralExtractor::new(Language::Rust);
        let code = "pub fn a() {}\npub struct B;\nimpl B { fn c(&self) {} }\n";
        let first = extractor.extract("lib.rs", code).unwrap();
        let second = extractor.extract("lib.rs", code).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[2].kind, SymbolKind::Method);
    }
}
