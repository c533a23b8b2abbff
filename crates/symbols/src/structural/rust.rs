use super::{decorator_name, first_doc_line, line_of, push_children, Pending, Source};
use crate::types::{ExtractedSymbol, SymbolKind};
use tree_sitter::Node;

/// Item lists, blocks and control flow whose bodies may hold items
const CONTAINERS: &[&str] = &[
    "declaration_list",
    "block",
    "expression_statement",
    "if_expression",
    "else_clause",
    "loop_expression",
    "while_expression",
    "for_expression",
    "match_expression",
    "match_block",
    "match_arm",
    "unsafe_block",
    "async_block",
    "const_block",
    "let_declaration",
    "closure_expression",
];

/// Walk items of the file. Functions inside impl/trait bodies are methods.
pub(super) fn collect<'a>(src: &Source<'a>, root: Node, out: &mut Vec<ExtractedSymbol>) {
    let mut stack = Vec::new();
    push_children(&mut stack, root, None, false);

    while let Some(Pending {
        node,
        parent,
        members: in_impl,
        ..
    }) = stack.pop()
    {
        match node.kind() {
            "function_item" => {
                if let Some((name, body)) = function(src, node, parent, in_impl, out) {
                    // Items declared inside a function body
                    push_children(&mut stack, body, Some(name), false);
                }
            }
            "function_signature_item" => {
                let Some(name_node) = node.child_by_field_name("name") else {
                    continue;
                };
                let kind = if in_impl {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let signature = src.span(node.start_byte(), node.end_byte());
                push(
                    src,
                    node,
                    src.text(name_node),
                    kind,
                    signature.trim_end_matches(';'),
                    parent,
                    out,
                );
            }
            "struct_item" | "enum_item" | "union_item" => {
                type_item(src, node, SymbolKind::Class, parent, out);
            }
            "trait_item" => {
                if let Some(name) = type_item(src, node, SymbolKind::Class, parent, out) {
                    if let Some(body) = node.child_by_field_name("body") {
                        push_children(&mut stack, body, Some(name), true);
                    }
                }
            }
            "impl_item" => {
                let target = impl_target(src, node);
                if let Some(body) = node.child_by_field_name("body") {
                    push_children(&mut stack, body, target.or(parent), true);
                }
            }
            "mod_item" => {
                if let Some(name) = type_item(src, node, SymbolKind::Other, parent, out) {
                    if let Some(body) = node.child_by_field_name("body") {
                        push_children(&mut stack, body, Some(name), false);
                    }
                }
            }
            kind if CONTAINERS.contains(&kind) => {
                push_children(&mut stack, node, parent, in_impl);
            }
            _ => {}
        }
    }
}

/// Push a function symbol; returns its name and body for the walker
fn function<'a, 't>(
    src: &Source<'a>,
    node: Node<'t>,
    parent: Option<&str>,
    in_impl: bool,
    out: &mut Vec<ExtractedSymbol>,
) -> Option<(&'a str, Node<'t>)> {
    let name = src.text(node.child_by_field_name("name")?);

    let kind = if in_impl {
        SymbolKind::Method
    } else if is_async(src, node) {
        SymbolKind::AsyncFunction
    } else {
        SymbolKind::Function
    };

    let body = node.child_by_field_name("body");
    let signature_end = body.map_or(node.end_byte(), |b| b.start_byte());
    let signature = src.span(node.start_byte(), signature_end);
    push(src, node, name, kind, &signature, parent, out);

    body.map(|body| (name, body))
}

/// Push a struct/enum/union/trait/mod and return its name
fn type_item<'a>(
    src: &Source<'a>,
    node: Node,
    kind: SymbolKind,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) -> Option<&'a str> {
    let name = src.text(node.child_by_field_name("name")?);
    let signature = match node.child_by_field_name("body") {
        Some(body) => src.span(node.start_byte(), body.start_byte()),
        None => src.span(node.start_byte(), node.end_byte()),
    };
    push(src, node, name, kind, signature.trim_end_matches(';'), parent, out);
    Some(name)
}

fn push(
    src: &Source,
    node: Node,
    name: &str,
    kind: SymbolKind,
    signature: &str,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) {
    let (attributes, docs) = leading_attributes_and_docs(src, node);
    out.push(
        ExtractedSymbol::new(name, kind, signature.trim(), src.path, line_of(node))
            .docstring(docs)
            .decorators(attributes)
            .parent(parent),
    );
}

fn is_async(src: &Source, node: Node) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| c.kind() == "function_modifiers" && src.text(c).contains("async"));
    found
}

/// Target type of an impl block: `impl<T> Store<T>` -> `Store`
fn impl_target<'a>(src: &Source<'a>, impl_node: Node) -> Option<&'a str> {
    let ty = impl_node.child_by_field_name("type")?;
    let name_node = match ty.kind() {
        "type_identifier" => ty,
        "generic_type" => ty.child_by_field_name("type")?,
        "scoped_type_identifier" => ty.child_by_field_name("name")?,
        _ => ty,
    };
    Some(src.text(name_node))
}

/// Attributes and the first outer doc line directly above an item
fn leading_attributes_and_docs(src: &Source, node: Node) -> (Vec<String>, Option<String>) {
    let mut attributes = Vec::new();
    let mut doc_lines: Vec<&str> = Vec::new();

    let mut current = node.prev_sibling();
    while let Some(prev) = current {
        let text = src.text(prev).trim();
        match prev.kind() {
            "attribute_item" => attributes.push(decorator_name(text)),
            "line_comment" if text.starts_with("///") && !text.starts_with("////") => {
                doc_lines.push(text.trim_start_matches("///"));
            }
            "block_comment" if text.starts_with("/**") && !text.starts_with("/***") => {
                doc_lines.push(text);
            }
            _ => break,
        }
        current = prev.prev_sibling();
    }

    attributes.reverse();
    doc_lines.reverse();
    let docs = doc_lines.iter().find_map(|line| first_doc_line(line));
    (attributes, docs)
}

#[cfg(test)]
mod tests {
    use crate::extractor::SymbolExtractor;
    use crate::language::Language;
    use crate::structural::StructuralExtractor;
    use crate::types::{ExtractedSymbol, SymbolKind};
    use pretty_assertions::assert_eq;

    fn extract(code: &str) -> Vec<ExtractedSymbol> {
        StructuralExtractor::new(Language::Rust)
            .extract("src/cache.rs", code)
            .expect("rust should parse")
    }

    #[test]
    fn test_items_impls_and_traits() {
        let code = r#"
/// Two-tier store.
///
/// Second paragraph.
#[derive(Debug, Clone)]
pub struct Store<T> {
    items: Vec<T>,
}

impl<T: Clone> Store<T> {
    /// Build an empty store.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub async fn load(&mut self, path: &str) -> std::io::Result<()> {
        Ok(())
    }
}

pub trait Backend {
    fn get(&self, key: &str) -> Option<String>;
}

#[tokio::test]
async fn loads_from_disk() {}
"#;
        let symbols = extract(code);
        let names: Vec<(&str, SymbolKind)> =
            symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("Store", SymbolKind::Class),
                ("new", SymbolKind::Method),
                ("load", SymbolKind::Method),
                ("Backend", SymbolKind::Class),
                ("get", SymbolKind::Method),
                ("loads_from_disk", SymbolKind::AsyncFunction),
            ]
        );

        let store = &symbols[0];
        assert_eq!(store.signature, "pub struct Store<T>");
        assert_eq!(store.docstring.as_deref(), Some("Two-tier store."));
        assert_eq!(store.decorators, vec!["derive"]);

        let new = &symbols[1];
        assert_eq!(new.parent.as_deref(), Some("Store"));
        assert_eq!(new.signature, "pub fn new() -> Self");
        assert_eq!(new.docstring.as_deref(), Some("Build an empty store."));

        assert_eq!(
            symbols[2].signature,
            "pub async fn load(&mut self, path: &str) -> std::io::Result<()>"
        );
        assert_eq!(symbols[4].signature, "fn get(&self, key: &str) -> Option<String>");
        assert_eq!(symbols[4].parent.as_deref(), Some("Backend"));
        assert_eq!(symbols[5].decorators, vec!["tokio::test"]);
    }

    #[test]
    fn test_methods_inside_module_impl() {
        let code = r"
mod api {
    pub struct Car;

    impl Car {
        pub fn drive(&self) {}
        fn stop(&self) {}
    }
}
";
        let symbols = extract(code);
        let api = &symbols[0];
        assert_eq!(api.kind, SymbolKind::Other);
        assert_eq!(api.signature, "mod api");

        let methods: Vec<_> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Method)
            .map(|s| (s.name.as_str(), s.parent.as_deref()))
            .collect();
        assert_eq!(methods, vec![("drive", Some("Car")), ("stop", Some("Car"))]);
        assert_eq!(symbols[1].signature, "pub struct Car");
    }

    #[test]
    fn test_unclosed_brace_fails() {
        let err = StructuralExtractor::new(Language::Rust)
            .extract("bad.rs", "fn main() {\n    let x = 1;\n")
            .unwrap_err();
        assert!(err.is_parse_failure());
    }

    #[test]
    fn test_items_nested_in_function_bodies() {
        let code = r"
fn main() {
    if true {
        fn helper() {}
    }
    let run = || {
        struct Local;
    };
}
";
        let symbols = extract(code);
        let names: Vec<(&str, SymbolKind, Option<&str>)> = symbols
            .iter()
            .map(|s| (s.name.as_str(), s.kind, s.parent.as_deref()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("main", SymbolKind::Function, None),
                ("helper", SymbolKind::Function, Some("main")),
                ("Local", SymbolKind::Class, Some("main")),
            ]
        );
    }
}
