//! Error types for the renaming engine.
//!
//! Each failure class from the engine's contract maps to one variant:
//!
//! - `Config`: invalid numeric parameters, rejected synchronously before
//!   any work.
//! - `Parse`: the analyzer rejected the input (or the post-resume source);
//!   fatal.
//! - `CollisionUnresolvable`: the disambiguation loop exceeded its sanity
//!   bound; fatal, indicates pathological input.
//!
//! Visitor failures, normalization misses, and checkpoint write failures
//! are *not* represented here: they are non-fatal by contract and are
//! handled inline (batch no-oped, name left alone, write retried at the
//! next interval), surfaced only through logging.

use thiserror::Error;

/// Invalid engine configuration. Raised before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_batch_size must be positive")]
    NonPositiveBatchSize,

    #[error("batch_concurrency must be positive")]
    NonPositiveConcurrency,

    #[error("context_window_size must be positive")]
    NonPositiveContextWindow,
}

/// The analyzer could not produce a usable program tree.
#[derive(Debug, Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

/// Unified error for the engine entry point.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The collision disambiguation loop failed to find a free name within
    /// its sanity bound.
    #[error("could not find a collision-free name for '{name}' after {attempts} attempts")]
    CollisionUnresolvable { name: String, attempts: u32 },

    /// Conflicting span edits; only reachable through an engine bug or a
    /// malformed analysis, so it is surfaced rather than swallowed.
    #[error("internal edit conflict: {0}")]
    EditConflict(#[from] crate::edit::EditConflict),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::NonPositiveBatchSize.to_string(),
            "max_batch_size must be positive"
        );
    }

    #[test]
    fn parse_error_wraps_into_engine_error() {
        let err: EngineError = ParseError::new("unexpected token").into();
        assert_eq!(err.to_string(), "parse error: unexpected token");
    }

    #[test]
    fn collision_error_names_the_identifier() {
        let err = EngineError::CollisionUnresolvable {
            name: "data".to_string(),
            attempts: 10_000,
        };
        assert!(err.to_string().contains("'data'"));
    }
}
