//! Span edits over an immutable original source.
//!
//! The "mutated tree" of the engine is realized as the original source text
//! plus an accumulating set of non-overlapping span replacements. Renames
//! record edits against *original* byte offsets; `materialize` produces the
//! current text, and `map_offset`/`map_span` translate original positions
//! into the current text so context extraction always sees applied renames.
//!
//! Edits are applied back-to-front so earlier offsets stay valid, the same
//! discipline used for batched rename rewrites.

use thiserror::Error;

use crate::text::Span;

/// Error raised when a new edit overlaps one already recorded.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("edit at {incoming} overlaps existing edit at {existing}")]
pub struct EditConflict {
    pub existing: Span,
    pub incoming: Span,
}

/// A single span replacement against the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SpanEdit {
    span: Span,
    text: String,
}

/// An accumulating set of non-overlapping replacements over one source text.
#[derive(Debug, Clone)]
pub struct EditSet {
    original: String,
    /// Sorted by span start; pairwise non-overlapping.
    edits: Vec<SpanEdit>,
}

impl EditSet {
    /// Create an empty edit set over `original`.
    pub fn new(original: impl Into<String>) -> Self {
        EditSet {
            original: original.into(),
            edits: Vec::new(),
        }
    }

    /// The unmodified original source.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Number of recorded edits.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Whether no edits have been recorded.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Record a replacement of `span` (original offsets) with `text`.
    ///
    /// Rejects edits that overlap an existing edit; identifier renames
    /// target pairwise-distinct spans, so an overlap means the caller
    /// attempted to rename the same occurrence twice.
    pub fn replace(&mut self, span: Span, text: impl Into<String>) -> Result<(), EditConflict> {
        let idx = self.edits.partition_point(|e| e.span.start < span.start);
        if idx > 0 && self.edits[idx - 1].span.overlaps(&span) {
            return Err(EditConflict {
                existing: self.edits[idx - 1].span,
                incoming: span,
            });
        }
        if idx < self.edits.len() && self.edits[idx].span.overlaps(&span) {
            return Err(EditConflict {
                existing: self.edits[idx].span,
                incoming: span,
            });
        }
        self.edits.insert(
            idx,
            SpanEdit {
                span,
                text: text.into(),
            },
        );
        Ok(())
    }

    /// Produce the current text with all edits applied.
    pub fn materialize(&self) -> String {
        let mut out = String::with_capacity(self.original.len());
        let mut cursor = 0usize;
        for edit in &self.edits {
            out.push_str(&self.original[cursor..edit.span.start as usize]);
            out.push_str(&edit.text);
            cursor = edit.span.end as usize;
        }
        out.push_str(&self.original[cursor..]);
        out
    }

    /// Map an original byte offset to the corresponding offset in the
    /// current text.
    ///
    /// Offsets strictly inside a replaced span map to the end of the
    /// replacement (replacements are atomic).
    pub fn map_offset(&self, offset: u64) -> u64 {
        let mut delta: i64 = 0;
        for edit in &self.edits {
            if edit.span.end <= offset {
                delta += edit.text.len() as i64 - edit.span.len() as i64;
            } else if edit.span.start < offset {
                // Inside the replaced span: land after the replacement.
                delta += edit.text.len() as i64 - (offset - edit.span.start) as i64;
            } else {
                break;
            }
        }
        (offset as i64 + delta) as u64
    }

    /// Map an original span to the current text.
    ///
    /// Edits fully inside the span stretch or shrink it; an edit exactly at
    /// the span maps to the replacement text's extent.
    pub fn map_span(&self, span: Span) -> Span {
        let start = self.map_offset(span.start);
        // Count edits that end at or before span.end so a replacement of the
        // span itself is included in the mapped extent.
        let mut delta: i64 = 0;
        for edit in &self.edits {
            if edit.span.end <= span.end {
                delta += edit.text.len() as i64 - edit.span.len() as i64;
            } else if edit.span.start < span.end {
                delta += edit.text.len() as i64 - (span.end - edit.span.start) as i64;
            } else {
                break;
            }
        }
        let end = (span.end as i64 + delta) as u64;
        Span::new(start, end.max(start))
    }
}
