//! Binding collection: every declaration site in the program.
//!
//! Walks the CST with the scope index from the scope pass and records one
//! binding per declared name:
//!
//! - `var` declarators hoist to the nearest function/program scope;
//!   `let`/`const` bind where they stand;
//! - function and class declaration names are attributed to the
//!   *enclosing* scope so they batch with their siblings, while named
//!   function/class expressions bind inside their own scope;
//! - parameters and catch parameters bind in the scope they parameterize;
//! - destructuring patterns contribute one binding per bound identifier,
//!   with shorthand positions flagged so renames expand them;
//! - import bindings are recorded low-signal: they take part in collision
//!   checks but are never sent to the LLM (renaming imports is out of
//!   scope);
//! - object property names, class method names, and labels are never
//!   bindings.

use std::collections::HashSet;

use humanify_core::{BindingKind, BindingSpec, ScopeId, ScopeMap, Span};
use tree_sitter::Node;

use crate::node_span;
use crate::scopes::ScopeIndex;

pub(crate) struct BindingCollector<'a> {
    source: &'a str,
    map: &'a mut ScopeMap,
    index: &'a ScopeIndex,
    /// Declaration identifier spans, excluded from the reference pass.
    decl_spans: HashSet<(u64, u64)>,
}

/// Collect all bindings. Returns the set of declaration identifier spans.
pub(crate) fn collect_bindings(
    root: Node<'_>,
    source: &str,
    map: &mut ScopeMap,
    index: &ScopeIndex,
    program: ScopeId,
) -> HashSet<(u64, u64)> {
    let mut collector = BindingCollector {
        source,
        map,
        index,
        decl_spans: HashSet::new(),
    };
    collector.walk(root, program);
    collector.decl_spans
}

impl<'a> BindingCollector<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    fn add(&mut self, spec: BindingSpec) {
        self.decl_spans.insert((spec.decl_span.start, spec.decl_span.end));
        self.map.add_binding(spec);
    }

    fn walk(&mut self, node: Node<'_>, enclosing: ScopeId) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let mut spec = BindingSpec::new(
                        self.text(name),
                        BindingKind::Function,
                        node_span(name),
                        enclosing,
                    )
                    .with_stmt_span(node_span(node));
                    if let Some(opened) = self.index.scope_of(node) {
                        spec = spec.with_opened_scope(opened);
                    }
                    if function_is_trivial(node) {
                        spec = spec.low_signal();
                    }
                    self.add(spec);
                }
            }
            "class_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let mut spec = BindingSpec::new(
                        self.text(name),
                        BindingKind::Class,
                        node_span(name),
                        enclosing,
                    )
                    .with_stmt_span(node_span(node));
                    if let Some(opened) = self.index.scope_of(node) {
                        spec = spec.with_opened_scope(opened);
                    }
                    if class_is_trivial(node) {
                        spec = spec.low_signal();
                    }
                    self.add(spec);
                }
            }
            "function_expression" | "function" | "generator_function" | "class" => {
                // A named expression binds its name inside its own scope.
                if let Some(name) = node.child_by_field_name("name") {
                    let own = self.index.scope_of(node).unwrap_or(enclosing);
                    let kind = if node.kind() == "class" {
                        BindingKind::Class
                    } else {
                        BindingKind::Function
                    };
                    let mut spec =
                        BindingSpec::new(self.text(name), kind, node_span(name), own)
                            .with_stmt_span(node_span(node));
                    if let Some(opened) = self.index.scope_of(node) {
                        spec = spec.with_opened_scope(opened);
                    }
                    self.add(spec);
                }
            }
            "variable_declaration" | "lexical_declaration" => {
                let kind = declaration_kind(node);
                let target = if kind == BindingKind::Var {
                    self.map.var_scope(enclosing)
                } else {
                    enclosing
                };
                let stmt_span = node_span(node);
                let mut cursor = node.walk();
                let declarators: Vec<Node<'_>> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "variable_declarator")
                    .collect();
                for declarator in declarators {
                    if let Some(pattern) = declarator.child_by_field_name("name") {
                        let trivial =
                            value_is_trivial(declarator.child_by_field_name("value"), self.source);
                        self.bind_pattern(pattern, kind, target, stmt_span, trivial);
                    }
                }
            }
            "formal_parameters" => {
                let stmt_span = node.parent().map(node_span).unwrap_or_else(|| node_span(node));
                let mut cursor = node.walk();
                let params: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                for param in params {
                    self.bind_pattern(param, BindingKind::Param, enclosing, stmt_span, false);
                }
            }
            "arrow_function" => {
                // Single-parameter arrows without parentheses.
                if let Some(param) = node.child_by_field_name("parameter") {
                    let own = self.index.scope_of(node).unwrap_or(enclosing);
                    self.bind_pattern(param, BindingKind::Param, own, node_span(node), false);
                }
            }
            "catch_clause" => {
                if let Some(param) = node.child_by_field_name("parameter") {
                    let own = self.index.scope_of(node).unwrap_or(enclosing);
                    let empty = node
                        .child_by_field_name("body")
                        .map(|b| b.named_child_count() == 0)
                        .unwrap_or(true);
                    let spec = BindingSpec::new(
                        self.text(param),
                        BindingKind::CatchParam,
                        node_span(param),
                        own,
                    )
                    .with_stmt_span(node_span(node));
                    if param.kind() == "identifier" {
                        let spec = if empty { spec.empty_catch() } else { spec };
                        self.add(spec);
                    } else {
                        // Destructured catch parameter.
                        self.bind_pattern(param, BindingKind::CatchParam, own, node_span(node), false);
                    }
                }
            }
            "for_in_statement" => {
                // `for (let x of xs)`: the declaration lives in the header,
                // not in a nested lexical_declaration node.
                if let Some(kind_tok) = node.child_by_field_name("kind") {
                    if let Some(left) = node.child_by_field_name("left") {
                        let kind = match self.text(kind_tok) {
                            "var" => BindingKind::Var,
                            "const" => BindingKind::Const,
                            _ => BindingKind::Let,
                        };
                        let own = self.index.scope_of(node).unwrap_or(enclosing);
                        let target = if kind == BindingKind::Var {
                            self.map.var_scope(own)
                        } else {
                            own
                        };
                        self.bind_pattern(left, kind, target, node_span(node), false);
                    }
                }
            }
            "import_statement" => {
                self.collect_imports(node, enclosing);
                return; // nothing else to find inside
            }
            _ => {}
        }

        let inner = self.index.scope_of(node).unwrap_or(enclosing);
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk(child, inner);
        }
    }

    /// Bind every identifier a declaration pattern introduces.
    fn bind_pattern(
        &mut self,
        node: Node<'_>,
        kind: BindingKind,
        scope: ScopeId,
        stmt_span: Span,
        low_signal: bool,
    ) {
        match node.kind() {
            "identifier" => {
                let mut spec = BindingSpec::new(self.text(node), kind, node_span(node), scope)
                    .with_stmt_span(stmt_span);
                if low_signal {
                    spec = spec.low_signal();
                }
                self.add(spec);
            }
            "shorthand_property_identifier_pattern" => {
                let mut spec = BindingSpec::new(self.text(node), kind, node_span(node), scope)
                    .with_stmt_span(stmt_span)
                    .shorthand();
                if low_signal {
                    spec = spec.low_signal();
                }
                self.add(spec);
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind_pattern(left, kind, scope, stmt_span, low_signal);
                }
            }
            "pair_pattern" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.bind_pattern(value, kind, scope, stmt_span, low_signal);
                }
            }
            "rest_pattern" => {
                if let Some(inner) = node.named_child(0) {
                    self.bind_pattern(inner, kind, scope, stmt_span, low_signal);
                }
            }
            "object_pattern" => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.bind_pattern(child, kind, scope, stmt_span, low_signal);
                }
            }
            "array_pattern" => {
                // A bare single-element pattern carries no naming signal.
                let lone = node.named_child_count() == 1
                    && node.named_child(0).map(|c| c.kind()) == Some("identifier");
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.bind_pattern(child, kind, scope, stmt_span, low_signal || lone);
                }
            }
            _ => {}
        }
    }

    fn collect_imports(&mut self, node: Node<'_>, scope: ScopeId) {
        let stmt_span = node_span(node);
        let mut cursor = node.walk();
        let clauses: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "import_clause")
            .collect();
        for clause in clauses {
            let mut cursor = clause.walk();
            let parts: Vec<Node<'_>> = clause.named_children(&mut cursor).collect();
            for part in parts {
                match part.kind() {
                    "identifier" => self.add_import(part, scope, stmt_span),
                    "namespace_import" => {
                        if let Some(name) = first_identifier(part) {
                            self.add_import(name, scope, stmt_span);
                        }
                    }
                    "named_imports" => {
                        let mut cursor = part.walk();
                        let specs: Vec<Node<'_>> = part
                            .named_children(&mut cursor)
                            .filter(|c| c.kind() == "import_specifier")
                            .collect();
                        for spec in specs {
                            let local = spec
                                .child_by_field_name("alias")
                                .or_else(|| spec.child_by_field_name("name"));
                            if let Some(local) = local {
                                self.add_import(local, scope, stmt_span);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn add_import(&mut self, name: Node<'_>, scope: ScopeId, stmt_span: Span) {
        let spec = BindingSpec::new(
            self.text(name),
            BindingKind::Import,
            node_span(name),
            scope,
        )
        .with_stmt_span(stmt_span)
        .low_signal();
        self.add(spec);
    }
}

fn declaration_kind(node: Node<'_>) -> BindingKind {
    if node.kind() == "variable_declaration" {
        return BindingKind::Var;
    }
    match node.child(0).map(|c| c.kind()) {
        Some("const") => BindingKind::Const,
        _ => BindingKind::Let,
    }
}

fn function_is_trivial(node: Node<'_>) -> bool {
    let body_empty = node
        .child_by_field_name("body")
        .map(|b| b.named_child_count() == 0)
        .unwrap_or(false);
    let params = node
        .child_by_field_name("parameters")
        .map(|p| p.named_child_count())
        .unwrap_or(0);
    body_empty && params <= 1
}

fn class_is_trivial(node: Node<'_>) -> bool {
    node.child_by_field_name("body")
        .map(|b| b.named_child_count() == 0)
        .unwrap_or(false)
}

fn value_is_trivial(value: Option<Node<'_>>, source: &str) -> bool {
    let Some(value) = value else {
        return false;
    };
    match value.kind() {
        "string" => {
            let text = value.utf8_text(source.as_bytes()).unwrap_or_default();
            text == "\"\"" || text == "''"
        }
        "object" | "array" => value.named_child_count() == 0,
        _ => false,
    }
}

fn first_identifier<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let result = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "identifier");
    result
}
