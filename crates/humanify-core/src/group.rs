//! Grouping: partition bindings by their grouping scope.
//!
//! The grouping scope is the scope a binding is declared in, which for
//! function and class declarations is already the enclosing scope (the
//! analyzer attributes them there), so a function is grouped with its
//! siblings rather than alone.
//!
//! Groups are sorted by scope span size ascending: inner, name-rich scopes
//! are renamed before outer ones, which limits collision cascades.

use crate::scope_map::{BindingId, ScopeId, ScopeKind, ScopeMap};
use crate::text::{byte_offset_to_line_col, LineCol};

/// Grouping key: scope kind plus the scope's start/end positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub kind_tag: u8,
    pub start: LineCol,
    pub end: LineCol,
}

impl GroupKey {
    fn for_scope(map: &ScopeMap, source: &str, scope: ScopeId) -> Self {
        let s = map.scope(scope);
        let kind_tag = match s.kind {
            ScopeKind::Program => 0,
            ScopeKind::Function => 1,
            ScopeKind::Class => 2,
            ScopeKind::Block => 3,
        };
        GroupKey {
            kind_tag,
            start: byte_offset_to_line_col(source, s.span.start),
            end: byte_offset_to_line_col(source, s.span.end),
        }
    }
}

/// An ordered collection of bindings sharing a grouping scope.
#[derive(Debug, Clone)]
pub struct Group {
    /// The grouping scope all members are declared in.
    pub scope: ScopeId,
    /// Members in declaration order.
    pub bindings: Vec<BindingId>,
}

impl Group {
    /// Span size of the grouping scope in bytes.
    pub fn scope_span_bytes(&self, map: &ScopeMap) -> u64 {
        map.scope(self.scope).span.len()
    }
}

/// Partition all bindings into groups and sort the groups smallest scope
/// first (ties broken by scope start offset for determinism).
pub fn group_bindings(map: &ScopeMap, source: &str) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: std::collections::HashMap<GroupKey, usize> = std::collections::HashMap::new();

    for id in map.bindings_in_decl_order() {
        let scope = map.binding(id).scope;
        let key = GroupKey::for_scope(map, source, scope);
        match index.get(&key) {
            Some(at) => groups[*at].bindings.push(id),
            None => {
                index.insert(key, groups.len());
                groups.push(Group {
                    scope,
                    bindings: vec![id],
                });
            }
        }
    }

    groups.sort_by_key(|g| {
        let span = map.scope(g.scope).span;
        (span.len(), span.start)
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope_map::{BindingKind, BindingSpec};
    use crate::text::Span;

    /// program [0,100) { a, f }, function f [20,60) { x }, function g's
    /// scope [60,80) { y } with g itself bound at program level.
    fn fixture() -> (ScopeMap, String) {
        let source = " ".repeat(100);
        let mut map = ScopeMap::new(100);
        let program = map.add_scope(ScopeKind::Program, Span::new(0, 100), None, None, false);
        let f = map.add_scope(
            ScopeKind::Function,
            Span::new(20, 60),
            Some(program),
            Some("f".into()),
            false,
        );
        let g = map.add_scope(
            ScopeKind::Function,
            Span::new(60, 80),
            Some(program),
            Some("g".into()),
            false,
        );
        map.add_binding(
            BindingSpec::new("a", BindingKind::Const, Span::new(6, 7), program)
                .with_stmt_span(Span::new(0, 10)),
        );
        map.add_binding(
            BindingSpec::new("f", BindingKind::Function, Span::new(29, 30), program)
                .with_opened_scope(f)
                .with_stmt_span(Span::new(20, 60)),
        );
        map.add_binding(
            BindingSpec::new("x", BindingKind::Let, Span::new(40, 41), f)
                .with_stmt_span(Span::new(36, 46)),
        );
        map.add_binding(
            BindingSpec::new("y", BindingKind::Let, Span::new(70, 71), g)
                .with_stmt_span(Span::new(66, 76)),
        );
        (map, source)
    }

    #[test]
    fn function_names_group_with_their_siblings() {
        let (map, source) = fixture();
        let groups = group_bindings(&map, &source);
        // Three grouping scopes: g [60,80), f [20,60), program [0,100).
        assert_eq!(groups.len(), 3);
        let program_group = groups
            .iter()
            .find(|g| map.scope(g.scope).kind == ScopeKind::Program)
            .unwrap();
        let names: Vec<&str> = program_group
            .bindings
            .iter()
            .map(|b| map.binding(*b).current_name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "f"]);
    }

    #[test]
    fn groups_sorted_smallest_scope_first() {
        let (map, source) = fixture();
        let groups = group_bindings(&map, &source);
        let sizes: Vec<u64> = groups.iter().map(|g| g.scope_span_bytes(&map)).collect();
        assert_eq!(sizes, vec![20, 40, 100]);
    }

    #[test]
    fn members_keep_declaration_order() {
        let (map, source) = fixture();
        let groups = group_bindings(&map, &source);
        for group in &groups {
            let starts: Vec<u64> = group
                .bindings
                .iter()
                .map(|b| map.binding(*b).decl_span.start)
                .collect();
            let mut sorted = starts.clone();
            sorted.sort_unstable();
            assert_eq!(starts, sorted);
        }
    }
}
