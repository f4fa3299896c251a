//! Reference resolution: attach every identifier use to its binding.
//!
//! Walks the CST with the scope index, resolving each candidate identifier
//! through the scope chain at its position. Shadowing falls out of the
//! innermost-first lookup. Names with no binding in scope (`arguments`,
//! `this`-adjacent pseudo-bindings, true globals) resolve to nothing and
//! are left untouched.
//!
//! Candidate positions are `identifier` nodes plus `shorthand_property_identifier`
//! (the `{name}` object-literal form, which renames must expand). Property
//! names, method names, and labels are different node kinds and never
//! resolve. Import subtrees are skipped wholesale: imported names are
//! module surface, not renameable bindings.

use std::collections::HashSet;

use humanify_core::{ScopeId, ScopeMap};
use tree_sitter::Node;

use crate::node_span;
use crate::scopes::ScopeIndex;

pub(crate) fn resolve_references(
    root: Node<'_>,
    source: &str,
    map: &mut ScopeMap,
    index: &ScopeIndex,
    decl_spans: &HashSet<(u64, u64)>,
    program: ScopeId,
) {
    walk(root, program, source, map, index, decl_spans);
}

fn walk(
    node: Node<'_>,
    enclosing: ScopeId,
    source: &str,
    map: &mut ScopeMap,
    index: &ScopeIndex,
    decl_spans: &HashSet<(u64, u64)>,
) {
    if node.kind() == "import_statement" {
        return;
    }

    if matches!(node.kind(), "identifier" | "shorthand_property_identifier") {
        let span = node_span(node);
        if !decl_spans.contains(&(span.start, span.end)) {
            let name = node.utf8_text(source.as_bytes()).unwrap_or_default();
            if let Some(binding) = map.resolve_name(enclosing, name) {
                map.add_reference(
                    binding,
                    span,
                    node.kind() == "shorthand_property_identifier",
                );
            }
        }
        return;
    }

    let inner = index.scope_of(node).unwrap_or(enclosing);
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    drop(cursor);
    for child in children {
        walk(child, inner, source, map, index, decl_spans);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::{bindings::collect_bindings, scopes::collect_scopes};

    fn analyze(source: &str) -> ScopeMap {
        let tree = parse(source).unwrap();
        let mut map = ScopeMap::new(source.len() as u64);
        let (program, index) = collect_scopes(tree.root_node(), source, &mut map);
        let decls = collect_bindings(tree.root_node(), source, &mut map, &index, program);
        resolve_references(tree.root_node(), source, &mut map, &index, &decls, program);
        map
    }

    fn refs_of<'m>(map: &'m ScopeMap, name: &str) -> Vec<(u64, u64)> {
        let binding = map
            .bindings()
            .find(|b| b.original_name == name)
            .unwrap_or_else(|| panic!("no binding named {name}"));
        binding
            .references
            .iter()
            .map(|r| (r.span.start, r.span.end))
            .collect()
    }

    #[test]
    fn declaration_site_is_not_a_reference() {
        let map = analyze("const a = 1;");
        assert!(refs_of(&map, "a").is_empty());
    }

    #[test]
    fn uses_resolve_to_the_binding() {
        let source = "const a = 1; const b = a + a;";
        let map = analyze(source);
        let refs = refs_of(&map, "a");
        assert_eq!(refs.len(), 2);
        for (start, end) in refs {
            assert_eq!(&source[start as usize..end as usize], "a");
        }
    }

    #[test]
    fn shadowing_keeps_inner_and_outer_apart() {
        let source = "let x = 1; function f(x) { return x; } use(x);";
        let map = analyze(source);
        let bindings: Vec<_> = map
            .bindings()
            .filter(|b| b.original_name == "x")
            .collect();
        assert_eq!(bindings.len(), 2);
        let param = bindings
            .iter()
            .find(|b| b.kind == humanify_core::BindingKind::Param)
            .unwrap();
        let outer = bindings
            .iter()
            .find(|b| b.kind != humanify_core::BindingKind::Param)
            .unwrap();
        // The inner return resolves to the parameter, the trailing use to
        // the outer let.
        assert_eq!(param.references.len(), 1);
        assert_eq!(outer.references.len(), 1);
        assert!(param.references[0].span.start < outer.references[0].span.start);
    }

    #[test]
    fn member_property_names_do_not_resolve() {
        let source = "const a = 1; obj.a = 2; obj[a] = 3;";
        let map = analyze(source);
        // Only the computed subscript references the binding.
        assert_eq!(refs_of(&map, "a").len(), 1);
    }

    #[test]
    fn object_keys_do_not_resolve_but_shorthand_does() {
        let source = "const a = 1; const o = { a: 2 }; const p = { a };";
        let map = analyze(source);
        let a = map.bindings().find(|b| b.original_name == "a").unwrap();
        assert_eq!(a.references.len(), 1);
        assert!(a.references[0].shorthand);
    }

    #[test]
    fn arguments_is_untouched() {
        let map = analyze("function foo() { arguments = \"x\"; }");
        // No binding named arguments, so the write resolves to nothing.
        assert!(map.bindings().all(|b| b.original_name != "arguments"));
        assert!(refs_of(&map, "foo").is_empty());
    }

    #[test]
    fn hoisted_function_calls_resolve() {
        let source = "run(); function run() {}";
        let map = analyze(source);
        assert_eq!(refs_of(&map, "run").len(), 1);
    }

    #[test]
    fn var_reference_before_declaration_resolves() {
        let source = "function f() { g(v); var v = 1; }";
        let map = analyze(source);
        assert_eq!(refs_of(&map, "v").len(), 1);
    }

    #[test]
    fn labels_do_not_resolve() {
        let source = "const done = 1;\ndone: for (;;) { break done; }";
        let map = analyze(source);
        assert!(refs_of(&map, "done").is_empty());
    }

    #[test]
    fn export_specifiers_reference_local_bindings() {
        let source = "const util = 1; export { util };";
        let map = analyze(source);
        assert_eq!(refs_of(&map, "util").len(), 1);
    }

    #[test]
    fn import_uses_resolve_but_import_names_do_not() {
        let source = "import { helper } from './mod'; helper();";
        let map = analyze(source);
        let refs = refs_of(&map, "helper");
        assert_eq!(refs.len(), 1, "only the call site references the import");
    }
}
