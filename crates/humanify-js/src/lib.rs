//! JavaScript analysis for the humanify renaming engine.
//!
//! This crate implements the parser capability the engine consumes:
//! tree-sitter parsing plus three passes over the CST (scopes, bindings,
//! references) that produce the [`ScopeMap`] the language-agnostic engine
//! operates on.
//!
//! ```
//! use humanify_core::ScopeAnalyzer;
//! use humanify_js::JsAnalyzer;
//!
//! let map = JsAnalyzer.analyze("const a = 1; use(a);").unwrap();
//! assert_eq!(map.binding_count(), 1);
//! ```

use humanify_core::{ParseError, ScopeAnalyzer, ScopeMap, Span};
use tree_sitter::Node;

mod bindings;
pub mod parser;
mod resolver;
mod scopes;

pub use parser::parse;

/// Byte span of a CST node.
pub(crate) fn node_span(node: Node<'_>) -> Span {
    Span::new(node.start_byte() as u64, node.end_byte() as u64)
}

/// The JavaScript implementation of the engine's analyzer seam.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsAnalyzer;

impl ScopeAnalyzer for JsAnalyzer {
    fn analyze(&self, source: &str) -> Result<ScopeMap, ParseError> {
        let tree = parser::parse(source)?;
        let root = tree.root_node();
        let mut map = ScopeMap::new(source.len() as u64);
        let (program, index) = scopes::collect_scopes(root, source, &mut map);
        let decls = bindings::collect_bindings(root, source, &mut map, &index, program);
        resolver::resolve_references(root, source, &mut map, &index, &decls, program);
        tracing::debug!(
            scopes = map.scopes().count(),
            bindings = map.binding_count(),
            "analyzed program"
        );
        Ok(map)
    }
}
