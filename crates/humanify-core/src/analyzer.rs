//! Analyzer seam between the engine and a concrete parser.
//!
//! The engine consumes any parser capability that can turn source text into
//! a [`ScopeMap`]: scopes with spans and parents, bindings attributed to
//! their declaring scope, and references resolved with shadowing intact.
//! Everything downstream (grouping, merging, context extraction, renaming)
//! is expressed against the map and the original text, so analyzers are
//! drop-in replacements.

use crate::error::ParseError;
use crate::scope_map::ScopeMap;

/// Produces the scope/binding analysis for one source text.
///
/// Contract:
/// - every declared name in the program appears exactly once as a binding
///   (references are attached to bindings, never enumerated as bindings);
/// - function and class declaration names are attributed to the *enclosing*
///   scope;
/// - object property names, class method names, and import *sources* never
///   appear as bindings;
/// - source positions are byte offsets into the exact `source` argument.
pub trait ScopeAnalyzer {
    /// Analyze `source`, or fail with `ParseError` if no tree can be
    /// produced.
    fn analyze(&self, source: &str) -> Result<ScopeMap, ParseError>;
}
