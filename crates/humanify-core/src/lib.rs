//! Core infrastructure for humanify: the language-agnostic renaming engine.
//!
//! This crate turns a [`scope_map::ScopeMap`] (produced by a language
//! analyzer such as `humanify-js`) plus a [`visitor::NameVisitor`] (an LLM
//! behind an async trait) into a fully renamed source text:
//!
//! - `group` / `merge` / `batch`: partition bindings into LLM-sized units,
//!   smallest scopes first;
//! - `context`: extract a bounded code slice per batch;
//! - `engine`: drive concurrent visitor calls and apply scope-aware
//!   renames deterministically;
//! - `checkpoint`: durable resume state in a sidecar file next to the
//!   user's code.

pub mod analyzer;
pub mod batch;
pub mod checkpoint;
pub mod context;
pub mod edit;
pub mod engine;
pub mod error;
pub mod group;
pub mod merge;
pub mod names;
pub mod progress;
pub mod scope_map;
pub mod skip;
pub mod text;
pub mod visitor;

pub use analyzer::ScopeAnalyzer;
pub use engine::{RenameEngine, RenameOptions, RunStats};
pub use error::{ConfigError, EngineError, ParseError};
pub use progress::ProgressFn;
pub use scope_map::{
    Binding, BindingId, BindingKind, BindingSpec, Reference, Scope, ScopeId, ScopeKind, ScopeMap,
};
pub use text::Span;
pub use visitor::{FnVisitor, IdentityVisitor, NameVisitor, VisitorError};
