//! humanify: rename minified JavaScript identifiers with LLM suggestions.
//!
//! The engine takes minified or obfuscated JavaScript, batches its
//! identifier bindings scope by scope, asks a visitor (an LLM behind
//! [`NameVisitor`]) for better names, and applies the answers with
//! scope-aware, collision-free renames. Long runs checkpoint into a
//! sidecar file and resume safely.
//!
//! This crate is the front door: it wires the JavaScript analyzer from
//! `humanify-js` into the engine from `humanify-core` and hosts the CLI.
//!
//! ```no_run
//! use std::sync::Arc;
//! use humanify::{rename, IdentityVisitor, RenameOptions};
//!
//! # async fn demo() -> Result<(), humanify::EngineError> {
//! let out = rename(
//!     "const a = 1;",
//!     Arc::new(IdentityVisitor),
//!     RenameOptions::new(4_000),
//!     None,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

// Engine and analyzer, re-exported as the public API surface.
pub use humanify_core::{
    ConfigError, EngineError, ParseError, ProgressFn, RenameOptions, RunStats,
};
pub use humanify_core::{FnVisitor, IdentityVisitor, NameVisitor, VisitorError};
pub use humanify_js::JsAnalyzer;

pub mod cli;
pub mod visitors;

use humanify_core::RenameEngine;

/// Rename identifiers in `source` and return the transformed text.
///
/// The input text (and the file behind `options.file_path`, if any) is
/// never modified; callers decide where the output goes. See
/// [`RenameOptions`] for batching, concurrency, collision policy, and
/// resume configuration.
pub async fn rename(
    source: &str,
    visitor: Arc<dyn NameVisitor>,
    options: RenameOptions,
    on_progress: Option<ProgressFn>,
) -> Result<String, EngineError> {
    let engine = RenameEngine::new(JsAnalyzer, visitor, options)?;
    engine.run(source, on_progress).await
}

/// Like [`rename`], additionally returning the run's counters.
pub async fn rename_with_stats(
    source: &str,
    visitor: Arc<dyn NameVisitor>,
    options: RenameOptions,
    on_progress: Option<ProgressFn>,
) -> Result<(String, RunStats), EngineError> {
    let engine = RenameEngine::new(JsAnalyzer, visitor, options)?;
    engine.run_with_stats(source, on_progress).await
}
