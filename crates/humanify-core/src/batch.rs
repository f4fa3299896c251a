//! Batch splitting: the unit of one LLM call.
//!
//! Merged groups are cut into batches of at most `max_batch_size` bindings,
//! preserving declaration order. The visitor sees each name once: the name
//! list collapses duplicates (possible after merging two scopes that both
//! use `i`) to the first occurrence, and the returned mapping is applied to
//! every member bearing that name.

use crate::scope_map::{BindingId, ScopeMap};
use crate::merge::MergedGroup;

/// A non-empty run of bindings sent to one LLM call.
#[derive(Debug, Clone)]
pub struct Batch {
    pub bindings: Vec<BindingId>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Distinct current names in declaration order: the visitor's input.
    pub fn names(&self, map: &ScopeMap) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut names = Vec::with_capacity(self.bindings.len());
        for id in &self.bindings {
            let name = &map.binding(*id).current_name;
            if seen.insert(name.clone()) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Cut merged groups into batches of at most `max_batch_size`, preserving
/// in-group order. A group of `n` bindings yields `ceil(n / max)` batches.
pub fn split_batches(groups: Vec<MergedGroup>, max_batch_size: usize) -> Vec<Batch> {
    let mut out = Vec::new();
    for group in groups {
        for chunk in group.bindings.chunks(max_batch_size) {
            if !chunk.is_empty() {
                out.push(Batch {
                    bindings: chunk.to_vec(),
                });
            }
        }
    }
    out
}
