//! The name visitor: the engine's seam to an LLM.
//!
//! The engine hands a visitor an ordered list of identifier names plus a
//! code context and gets back a mapping from old names to suggestions. The
//! `#[async_trait]` macro is required because the engine stores the visitor
//! as `Arc<dyn NameVisitor>`, which requires object safety. Native async fn
//! in traits is not object-safe in Rust.
//!
//! Contract on the returned mapping:
//! - keys SHOULD include every input name; a missing key means "leave this
//!   binding alone";
//! - a value equal to its key, or empty/whitespace, also means "leave
//!   alone";
//! - values are normalized by the engine, so the visitor may return raw
//!   model output;
//! - the engine never assumes the mapping preserves input order.
//!
//! Visitors own their timeouts and retries; if one ultimately fails, the
//! engine no-ops the batch and continues.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// A visitor failure. Non-fatal: the batch is no-oped and the run goes on.
#[derive(Debug, Error)]
pub enum VisitorError {
    /// The visitor's transport or process failed.
    #[error("visitor failed: {message}")]
    Failed { message: String },

    /// The visitor returned something that could not be interpreted as a
    /// name mapping.
    #[error("visitor returned unparseable output: {message}")]
    Unparseable { message: String },
}

impl VisitorError {
    pub fn failed(message: impl Into<String>) -> Self {
        VisitorError::Failed {
            message: message.into(),
        }
    }

    pub fn unparseable(message: impl Into<String>) -> Self {
        VisitorError::Unparseable {
            message: message.into(),
        }
    }
}

/// Suggests new names for a batch of identifiers.
///
/// May be invoked concurrently, up to the engine's `batch_concurrency`.
#[async_trait]
pub trait NameVisitor: Send + Sync {
    /// Given the batch's names (distinct, in declaration order) and the
    /// extracted code context, return a `{old name -> suggestion}` mapping.
    async fn visit(
        &self,
        names: &[String],
        context: &str,
    ) -> Result<HashMap<String, String>, VisitorError>;
}

/// A visitor that leaves every name alone. Useful for tests and for dry
/// runs exercising the full pipeline without an LLM.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityVisitor;

#[async_trait]
impl NameVisitor for IdentityVisitor {
    async fn visit(
        &self,
        names: &[String],
        _context: &str,
    ) -> Result<HashMap<String, String>, VisitorError> {
        Ok(names.iter().map(|n| (n.clone(), n.clone())).collect())
    }
}

/// A visitor backed by a plain function, for tests and embedding.
pub struct FnVisitor<F>(pub F);

#[async_trait]
impl<F> NameVisitor for FnVisitor<F>
where
    F: Fn(&[String], &str) -> HashMap<String, String> + Send + Sync,
{
    async fn visit(
        &self,
        names: &[String],
        context: &str,
    ) -> Result<HashMap<String, String>, VisitorError> {
        Ok((self.0)(names, context))
    }
}
