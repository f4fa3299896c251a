//! Scope collection over the JavaScript CST.
//!
//! One recursive pass builds every lexical scope into the `ScopeMap`:
//! program, function-likes (declarations, expressions, arrows, methods),
//! classes, and block-creating constructs (standalone blocks, `for` heads,
//! `catch` clauses). A function's body block does not get its own scope;
//! parameters and body share the function scope.
//!
//! The returned [`ScopeIndex`] maps CST node spans back to scope ids so the
//! binding and reference passes can walk the same tree and land in the same
//! scopes.

use std::collections::HashMap;

use humanify_core::{ScopeId, ScopeKind, ScopeMap, Span};
use tree_sitter::Node;

use crate::node_span;

/// Node-span to scope-id index shared by the later passes.
pub(crate) struct ScopeIndex {
    by_span: HashMap<(u64, u64), ScopeId>,
}

impl ScopeIndex {
    /// The scope opened by this node, if it opens one.
    pub(crate) fn scope_of(&self, node: Node<'_>) -> Option<ScopeId> {
        self.by_span
            .get(&(node.start_byte() as u64, node.end_byte() as u64))
            .copied()
    }
}

pub(crate) const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

fn is_function_like(kind: &str) -> bool {
    FUNCTION_KINDS.contains(&kind)
}

/// The scope kind a node opens, if any.
fn scope_kind_of(node: Node<'_>) -> Option<ScopeKind> {
    let kind = node.kind();
    if is_function_like(kind) {
        return Some(ScopeKind::Function);
    }
    match kind {
        "class_declaration" | "class" => Some(ScopeKind::Class),
        "catch_clause" | "for_statement" | "for_in_statement" => Some(ScopeKind::Block),
        "statement_block" => {
            // Function bodies and catch bodies live in their owner's scope.
            let parent_kind = node.parent().map(|p| p.kind()).unwrap_or("");
            if is_function_like(parent_kind) || parent_kind == "catch_clause" {
                None
            } else {
                Some(ScopeKind::Block)
            }
        }
        _ => None,
    }
}

fn is_anonymous_expr(node: Node<'_>) -> bool {
    match node.kind() {
        "arrow_function" => true,
        "function_expression" | "function" | "generator_function" => {
            node.child_by_field_name("name").is_none()
        }
        _ => false,
    }
}

fn name_of(node: Node<'_>, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .map(|s| s.to_string())
}

/// Direct statement spans of the region a scope node owns.
fn body_stmts_of(node: Node<'_>) -> Vec<Span> {
    let list_node = match node.kind() {
        kind if is_function_like(kind) => node.child_by_field_name("body"),
        "class_declaration" | "class" => node.child_by_field_name("body"),
        "catch_clause" => node.child_by_field_name("body"),
        "for_statement" | "for_in_statement" => node.child_by_field_name("body"),
        "statement_block" => Some(node),
        _ => None,
    };
    let Some(list) = list_node else {
        return Vec::new();
    };
    if list.kind() != "statement_block" && list.kind() != "class_body" {
        // Expression-bodied arrows and single-statement loop bodies.
        return vec![node_span(list)];
    }
    let mut cursor = list.walk();
    list.named_children(&mut cursor).map(node_span).collect()
}

/// Build all scopes for the program. Returns the program scope and the
/// node index for the later passes.
pub(crate) fn collect_scopes(
    root: Node<'_>,
    source: &str,
    map: &mut ScopeMap,
) -> (ScopeId, ScopeIndex) {
    let program = map.add_scope(
        ScopeKind::Program,
        Span::new(0, source.len() as u64),
        None,
        None,
        false,
    );
    {
        let mut cursor = root.walk();
        let stmts = root.named_children(&mut cursor).map(node_span).collect();
        map.set_body_stmts(program, stmts);
    }

    let mut index = ScopeIndex {
        by_span: HashMap::new(),
    };
    walk(root, program, source, map, &mut index);
    (program, index)
}

fn walk(node: Node<'_>, parent: ScopeId, source: &str, map: &mut ScopeMap, index: &mut ScopeIndex) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match scope_kind_of(child) {
            Some(kind) => {
                let span = node_span(child);
                let scope = map.add_scope(
                    kind,
                    span,
                    Some(parent),
                    name_of(child, source),
                    is_anonymous_expr(child),
                );
                map.set_body_stmts(scope, body_stmts_of(child));
                index.by_span.insert((span.start, span.end), scope);
                walk(child, scope, source, map, index);
            }
            None => walk(child, parent, source, map, index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn scopes_for(source: &str) -> (ScopeMap, Vec<(ScopeKind, Option<String>)>) {
        let tree = parse(source).unwrap();
        let mut map = ScopeMap::new(source.len() as u64);
        collect_scopes(tree.root_node(), source, &mut map);
        let summary = map
            .scopes()
            .map(|s| (s.kind, s.name.clone()))
            .collect();
        (map, summary)
    }

    #[test]
    fn program_scope_spans_the_file() {
        let (map, summary) = scopes_for("const a = 1;\n");
        assert_eq!(summary, vec![(ScopeKind::Program, None)]);
        let program = map.scopes().next().unwrap();
        assert_eq!(program.span, Span::new(0, 13));
        assert_eq!(program.body_stmts.len(), 1);
    }

    #[test]
    fn function_declaration_opens_a_named_scope() {
        let (_, summary) = scopes_for("function work() { return 1; }");
        assert_eq!(
            summary,
            vec![
                (ScopeKind::Program, None),
                (ScopeKind::Function, Some("work".to_string())),
            ]
        );
    }

    #[test]
    fn function_body_block_is_not_a_separate_scope() {
        let (_, summary) = scopes_for("function f() { let x = 1; }");
        assert_eq!(summary.len(), 2, "program + function only");
    }

    #[test]
    fn standalone_block_is_a_scope() {
        let (_, summary) = scopes_for("{ let x = 1; }");
        assert_eq!(summary[1].0, ScopeKind::Block);
    }

    #[test]
    fn arrow_functions_are_anonymous_function_scopes() {
        let source = "const f = (x) => x + 1;";
        let tree = parse(source).unwrap();
        let mut map = ScopeMap::new(source.len() as u64);
        collect_scopes(tree.root_node(), source, &mut map);
        let arrow = map.scopes().nth(1).unwrap();
        assert_eq!(arrow.kind, ScopeKind::Function);
        assert!(arrow.anonymous_expr);
    }

    #[test]
    fn named_function_expression_is_not_anonymous() {
        let source = "const f = function helper() { return 1; };";
        let tree = parse(source).unwrap();
        let mut map = ScopeMap::new(source.len() as u64);
        collect_scopes(tree.root_node(), source, &mut map);
        let func = map.scopes().nth(1).unwrap();
        assert!(!func.anonymous_expr);
        assert_eq!(func.name.as_deref(), Some("helper"));
    }

    #[test]
    fn class_and_method_scopes_nest() {
        let (map, summary) = scopes_for("class Foo { bar() { return 1; } }");
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[1].0, ScopeKind::Class);
        assert_eq!(summary[2].0, ScopeKind::Function);
        let method = map.scopes().nth(2).unwrap();
        assert_eq!(method.parent, Some(map.scopes().nth(1).unwrap().id));
    }

    #[test]
    fn catch_and_for_create_block_scopes() {
        let (_, summary) = scopes_for("try { f(); } catch (e) { g(e); }");
        // program, try block, catch clause
        assert!(summary.iter().filter(|(k, _)| *k == ScopeKind::Block).count() >= 2);

        let (_, summary) = scopes_for("for (let i = 0; i < 3; i++) f(i);");
        assert!(summary.iter().any(|(k, _)| *k == ScopeKind::Block));
    }
}
