use super::{decorator_name, first_doc_line, line_of, push_children, Pending, Source};
use crate::types::{ExtractedSymbol, SymbolKind};
use tree_sitter::Node;

/// Compound statements and clauses whose bodies may hold declarations
const CONTAINERS: &[&str] = &[
    "block",
    "if_statement",
    "elif_clause",
    "else_clause",
    "for_statement",
    "while_statement",
    "try_statement",
    "except_clause",
    "except_group_clause",
    "finally_clause",
    "with_statement",
    "match_statement",
    "case_clause",
];

/// Walk the module, descending into compound statements only
pub(super) fn collect<'a>(src: &Source<'a>, root: Node, out: &mut Vec<ExtractedSymbol>) {
    let mut stack = Vec::new();
    push_children(&mut stack, root, None, false);

    while let Some(Pending {
        node,
        parent,
        members: in_class,
        ..
    }) = stack.pop()
    {
        let (definition, decorators) = match node.kind() {
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(definition) => (definition, decorators(src, node)),
                None => continue,
            },
            kind if CONTAINERS.contains(&kind) => {
                push_children(&mut stack, node, parent, in_class);
                continue;
            }
            _ => (node, Vec::new()),
        };

        match definition.kind() {
            "function_definition" => {
                if let Some((name, body)) =
                    function(src, definition, decorators, parent, in_class, out)
                {
                    push_children(&mut stack, body, Some(name), false);
                }
            }
            "class_definition" => {
                if let Some((name, body)) = class(src, definition, decorators, parent, out) {
                    push_children(&mut stack, body, Some(name), true);
                }
            }
            _ => {}
        }
    }
}

/// Push a function symbol; returns its name and body for the walker
fn function<'a, 't>(
    src: &Source<'a>,
    node: Node<'t>,
    decorators: Vec<String>,
    parent: Option<&str>,
    in_class: bool,
    out: &mut Vec<ExtractedSymbol>,
) -> Option<(&'a str, Node<'t>)> {
    let name_node = node.child_by_field_name("name")?;
    let name = src.text(name_node);

    let kind = if in_class {
        SymbolKind::Method
    } else if is_async(node) {
        SymbolKind::AsyncFunction
    } else {
        SymbolKind::Function
    };

    // `def name(params) -> ret`, without the trailing colon or body
    let signature_end = node
        .child_by_field_name("return_type")
        .or_else(|| node.child_by_field_name("parameters"))
        .map_or(name_node.end_byte(), |n| n.end_byte());
    let signature = src.span(node.start_byte(), signature_end);

    let body = node.child_by_field_name("body");
    let symbol = ExtractedSymbol::new(name, kind, signature, src.path, line_of(node))
        .docstring(body.and_then(|b| docstring(src, b)))
        .decorators(decorators)
        .parent(parent);
    out.push(symbol);

    body.map(|body| (name, body))
}

fn class<'a, 't>(
    src: &Source<'a>,
    node: Node<'t>,
    decorators: Vec<String>,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) -> Option<(&'a str, Node<'t>)> {
    let name_node = node.child_by_field_name("name")?;
    let name = src.text(name_node);

    let signature_end = node
        .child_by_field_name("superclasses")
        .or_else(|| node.child_by_field_name("type_parameters"))
        .map_or(name_node.end_byte(), |n| n.end_byte());
    let signature = src.span(node.start_byte(), signature_end);

    let body = node.child_by_field_name("body");
    let symbol = ExtractedSymbol::new(name, SymbolKind::Class, signature, src.path, line_of(node))
        .docstring(body.and_then(|b| docstring(src, b)))
        .decorators(decorators)
        .parent(parent);
    out.push(symbol);

    body.map(|body| (name, body))
}

fn is_async(node: Node) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == "async");
    found
}

fn decorators(src: &Source, decorated: Node) -> Vec<String> {
    let mut cursor = decorated.walk();
    decorated
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|c| decorator_name(src.text(c)))
        .filter(|name| !name.is_empty())
        .collect()
}

/// First line of a leading string literal in `body`
fn docstring(src: &Source, body: Node) -> Option<String> {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = first.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }

    let raw = src.text(literal);
    let unquoted = raw
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_matches(|c| c == '"' || c == '\'');
    first_doc_line(unquoted)
}
