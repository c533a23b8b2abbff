use super::{decorator_name, first_doc_line, line_of, push_children, Pending, Source};
use crate::types::{ExtractedSymbol, SymbolKind};
use tree_sitter::Node;

/// Statements and clauses whose bodies may hold declarations
const CONTAINERS: &[&str] = &[
    "statement_block",
    "expression_statement",
    "if_statement",
    "else_clause",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "try_statement",
    "catch_clause",
    "finally_clause",
    "switch_statement",
    "switch_body",
    "switch_case",
    "switch_default",
    "labeled_statement",
    "with_statement",
];

/// A declaration name paired with the body the walker should visit next
type Body<'a, 't> = (&'a str, Node<'t>);

/// Walk the program, descending into blocks, control flow and namespaces
pub(super) fn collect<'a>(src: &Source<'a>, root: Node, out: &mut Vec<ExtractedSymbol>) {
    let mut stack = Vec::new();
    push_children(&mut stack, root, None, false);

    while let Some(Pending {
        node,
        outer,
        parent,
        ..
    }) = stack.pop()
    {
        let bodies: Vec<Body> = match node.kind() {
            "export_statement" => {
                // Leading comments and decorators sit on the export wrapper
                if let Some(inner) = node.child_by_field_name("declaration") {
                    stack.push(Pending {
                        node: inner,
                        outer: node,
                        parent,
                        members: false,
                    });
                }
                continue;
            }
            "ambient_declaration" => {
                let mut cursor = node.walk();
                let inner: Vec<Node> = node.named_children(&mut cursor).collect();
                stack.extend(inner.into_iter().rev().map(|child| Pending {
                    node: child,
                    outer: node,
                    parent,
                    members: false,
                }));
                continue;
            }
            "function_declaration" | "generator_function_declaration" => {
                function(src, node, outer, parent, out).into_iter().collect()
            }
            "function_signature" => {
                function_signature(src, node, outer, parent, out);
                continue;
            }
            "class_declaration" | "abstract_class_declaration" => {
                class(src, node, outer, parent, out)
            }
            "lexical_declaration" | "variable_declaration" => {
                bound_functions(src, node, outer, parent, out)
            }
            "internal_module" | "module" => namespace(src, node, outer, parent, out)
                .into_iter()
                .collect(),
            "interface_declaration" | "enum_declaration" | "type_alias_declaration" => {
                type_declaration(src, node, outer, parent, out);
                continue;
            }
            kind if CONTAINERS.contains(&kind) => {
                push_children(&mut stack, node, parent, false);
                continue;
            }
            _ => continue,
        };

        // Reverse so the first body's declarations pop first
        for (name, body) in bodies.into_iter().rev() {
            push_children(&mut stack, body, Some(name), false);
        }
    }
}

fn function<'a, 't>(
    src: &Source<'a>,
    node: Node<'t>,
    outer: Node,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) -> Option<Body<'a, 't>> {
    let name = src.text(node.child_by_field_name("name")?);
    let kind = if has_token(node, "async") {
        SymbolKind::AsyncFunction
    } else {
        SymbolKind::Function
    };

    let body = node.child_by_field_name("body");
    let end = body.map_or(node.end_byte(), |b| b.start_byte());
    let signature = src.span(node.start_byte(), end);
    push(src, node, outer, name, kind, &signature, parent, out);

    body.map(|body| (name, body))
}

/// Body-less `function name(...): T;` from overloads and `declare` blocks
fn function_signature(
    src: &Source,
    node: Node,
    outer: Node,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let signature = src.span(node.start_byte(), node.end_byte());
    push(
        src,
        node,
        outer,
        src.text(name_node),
        SymbolKind::Function,
        signature.trim_end_matches(';'),
        parent,
        out,
    );
}

/// `namespace Auth { ... }` and `module "pkg" { ... }`
fn namespace<'a, 't>(
    src: &Source<'a>,
    node: Node<'t>,
    outer: Node,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) -> Option<Body<'a, 't>> {
    let name = src.text(node.child_by_field_name("name")?);
    let body = node.child_by_field_name("body");
    let end = body.map_or(node.end_byte(), |b| b.start_byte());
    let signature = src.span(node.start_byte(), end);
    push(
        src,
        node,
        outer,
        name,
        SymbolKind::Other,
        signature.trim_end_matches(';'),
        parent,
        out,
    );

    body.map(|body| (name, body))
}

/// Interfaces, enums and type aliases
fn type_declaration(
    src: &Source,
    node: Node,
    outer: Node,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let end = node
        .child_by_field_name("body")
        .or_else(|| node.child_by_field_name("value"))
        .map_or(node.end_byte(), |b| b.start_byte());
    let signature = src.span(node.start_byte(), end);
    push(
        src,
        node,
        outer,
        src.text(name_node),
        SymbolKind::Other,
        signature.trim_end_matches('='),
        parent,
        out,
    );
}

/// Push a class and its members; returns method bodies for the walker
fn class<'a, 't>(
    src: &Source<'a>,
    node: Node<'t>,
    outer: Node,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) -> Vec<Body<'a, 't>> {
    let mut bodies = Vec::new();
    let Some(name_node) = node.child_by_field_name("name") else {
        return bodies;
    };
    let name = src.text(name_node);

    let body = node.child_by_field_name("body");
    let end = body.map_or(node.end_byte(), |b| b.start_byte());
    let signature = src.span(signature_start(node), end);
    push(src, node, outer, name, SymbolKind::Class, &signature, parent, out);

    let Some(body) = body else {
        return bodies;
    };
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "method_definition" => bodies.extend(method(src, member, name, out)),
            "abstract_method_signature" | "method_signature" => {
                if let Some(member_name) = member.child_by_field_name("name") {
                    let signature = src.span(signature_start(member), member.end_byte());
                    push(
                        src,
                        member,
                        member,
                        src.text(member_name),
                        SymbolKind::Method,
                        signature.trim_end_matches(';'),
                        Some(name),
                        out,
                    );
                }
            }
            "field_definition" | "public_field_definition" => {
                bodies.extend(class_field_function(src, member, name, out));
            }
            _ => {}
        }
    }
    bodies
}

fn method<'a, 't>(
    src: &Source<'a>,
    node: Node<'t>,
    class_name: &str,
    out: &mut Vec<ExtractedSymbol>,
) -> Option<Body<'a, 't>> {
    let name = src.text(node.child_by_field_name("name")?);
    let body = node.child_by_field_name("body");
    let end = body.map_or(node.end_byte(), |b| b.start_byte());
    let signature = src.span(signature_start(node), end);
    push(
        src,
        node,
        node,
        name,
        SymbolKind::Method,
        &signature,
        Some(class_name),
        out,
    );

    body.map(|body| (name, body))
}

/// `handle = async (event) => { ... }` inside a class body
fn class_field_function<'a, 't>(
    src: &Source<'a>,
    node: Node<'t>,
    class_name: &str,
    out: &mut Vec<ExtractedSymbol>,
) -> Option<Body<'a, 't>> {
    let name_node = node
        .child_by_field_name("property")
        .or_else(|| node.child_by_field_name("name"))?;
    let value = node.child_by_field_name("value")?;
    if !is_function_value(value) {
        return None;
    }
    let name = src.text(name_node);
    let body = value.child_by_field_name("body");
    let end = body.map_or(value.end_byte(), |b| b.start_byte());
    let signature = src.span(signature_start(node), end);
    push(
        src,
        node,
        node,
        name,
        SymbolKind::Method,
        &signature,
        Some(class_name),
        out,
    );

    body.filter(|b| b.kind() == "statement_block")
        .map(|body| (name, body))
}

/// `const name = (...) => ...` and `let name = function (...) {...}`
fn bound_functions<'a, 't>(
    src: &Source<'a>,
    node: Node<'t>,
    outer: Node,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) -> Vec<Body<'a, 't>> {
    let mut bodies = Vec::new();
    let keyword = node.child(0).map_or("const", |k| src.text(k));
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else {
            continue;
        };
        if name_node.kind() != "identifier" {
            continue;
        }
        let Some(value) = declarator.child_by_field_name("value") else {
            continue;
        };
        if !is_function_value(value) {
            continue;
        }

        let name = src.text(name_node);
        let kind = if has_token(value, "async") {
            SymbolKind::AsyncFunction
        } else {
            SymbolKind::Function
        };
        let body = value.child_by_field_name("body");
        let end = body.map_or(value.end_byte(), |b| b.start_byte());
        let signature = format!("{keyword} {}", src.span(declarator.start_byte(), end));
        push(src, declarator, outer, name, kind, &signature, parent, out);

        if let Some(body) = body.filter(|b| b.kind() == "statement_block") {
            bodies.push((name, body));
        }
    }
    bodies
}

#[allow(clippy::too_many_arguments)]
fn push(
    src: &Source,
    node: Node,
    outer: Node,
    name: &str,
    kind: SymbolKind,
    signature: &str,
    parent: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) {
    let mut decorators = decorators(src, outer);
    if outer.id() != node.id() {
        decorators.extend(self::decorators(src, node));
    }
    out.push(
        ExtractedSymbol::new(name, kind, signature.trim(), src.path, line_of(node))
            .docstring(jsdoc(src, outer))
            .decorators(decorators)
            .parent(parent),
    );
}

fn is_function_value(value: Node) -> bool {
    matches!(
        value.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == token);
    found
}

/// Start of the declaration proper, after any decorators
fn signature_start(node: Node) -> usize {
    let mut cursor = node.walk();
    let start = node
        .children(&mut cursor)
        .find(|c| c.kind() != "decorator" && c.kind() != "comment")
        .map_or(node.start_byte(), |c| c.start_byte());
    start
}

/// Decorators owned by `node`, plus any the grammar hangs in front of it as siblings
fn decorators(src: &Source, node: Node) -> Vec<String> {
    let mut raw = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(prev) = current.filter(|p| p.kind() == "decorator") {
        raw.push(prev);
        current = prev.prev_sibling();
    }
    raw.reverse();

    let mut cursor = node.walk();
    raw.extend(node.children(&mut cursor).filter(|c| c.kind() == "decorator"));
    raw.into_iter()
        .map(|c| decorator_name(src.text(c)))
        .filter(|name| !name.is_empty())
        .collect()
}

/// First line of a `/** ... */` block directly above `node`
fn jsdoc(src: &Source, node: Node) -> Option<String> {
    let mut prev = node.prev_sibling()?;
    while prev.kind() == "decorator" {
        prev = prev.prev_sibling()?;
    }
    if prev.kind() != "comment" {
        return None;
    }
    let text = src.text(prev);
    if !text.starts_with("/**") {
        return None;
    }
    first_doc_line(text)
}
