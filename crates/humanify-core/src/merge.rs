//! Small-scope merging: coalesce neighbor groups into shared batches.
//!
//! A function with a single local is not worth a full LLM round-trip.
//! Groups at or under `small_scope_merge_limit` bindings are folded into a
//! pending accumulator, which flushes whenever folding would break one of
//! the rules:
//!
//! - names must stay distinct inside the accumulator;
//! - the accumulator never exceeds `max_batch_size`;
//! - all members must share the same merge boundary (nearest enclosing
//!   program/function/class) — cross-function context confuses the model;
//! - the incoming group must start within [`MERGE_PROXIMITY_LIMIT`] bytes
//!   of the accumulator's last declaration.

use std::collections::HashSet;

use tracing::trace;

use crate::group::Group;
use crate::scope_map::{BindingId, ScopeId, ScopeMap};
use crate::skip;

/// Maximum byte distance between the accumulator's last declaration and a
/// candidate group's first declaration. Without a proximity rule, tiny
/// scopes from opposite ends of a bundle end up in one prompt.
pub const MERGE_PROXIMITY_LIMIT: u64 = 5_000;

/// A run of one or more groups merged into a single batching unit.
#[derive(Debug, Clone)]
pub struct MergedGroup {
    pub bindings: Vec<BindingId>,
}

struct Accumulator {
    bindings: Vec<BindingId>,
    names: HashSet<String>,
    boundary: ScopeId,
    last_decl_end: u64,
}

/// Fold small groups into merged batches. `merge_limit == 0` disables
/// merging entirely; every group then passes through unchanged.
pub fn merge_small_groups(
    map: &ScopeMap,
    groups: Vec<Group>,
    merge_limit: usize,
    max_batch_size: usize,
) -> Vec<MergedGroup> {
    let mut out: Vec<MergedGroup> = Vec::new();
    let mut acc: Option<Accumulator> = None;

    let flush = |acc: &mut Option<Accumulator>, out: &mut Vec<MergedGroup>| {
        if let Some(a) = acc.take() {
            out.push(MergedGroup {
                bindings: a.bindings,
            });
        }
    };

    for group in groups {
        let mergeable = merge_limit > 0
            && group.bindings.len() <= merge_limit
            && !group
                .bindings
                .iter()
                .any(|b| skip::is_low_signal(map.binding(*b)));

        if !mergeable {
            flush(&mut acc, &mut out);
            out.push(MergedGroup {
                bindings: group.bindings,
            });
            continue;
        }

        let boundary = map.merge_boundary(group.scope);
        let first_decl = map.binding(group.bindings[0]).decl_span;
        let group_names: Vec<&str> = group
            .bindings
            .iter()
            .map(|b| map.binding(*b).current_name.as_str())
            .collect();

        if let Some(a) = &acc {
            let collides = group_names.iter().any(|n| a.names.contains(*n));
            let too_big = a.bindings.len() + group.bindings.len() > max_batch_size;
            let crosses_boundary = a.boundary != boundary;
            let too_far = first_decl.start.saturating_sub(a.last_decl_end) > MERGE_PROXIMITY_LIMIT;
            if collides || too_big || crosses_boundary || too_far {
                trace!(
                    collides,
                    too_big,
                    crosses_boundary,
                    too_far,
                    "flushing merge accumulator"
                );
                flush(&mut acc, &mut out);
            }
        }

        match &mut acc {
            Some(a) => {
                for b in &group.bindings {
                    a.names.insert(map.binding(*b).current_name.clone());
                    a.bindings.push(*b);
                }
                a.last_decl_end = map
                    .binding(*group.bindings.last().expect("group is non-empty"))
                    .decl_span
                    .end;
            }
            None => {
                acc = Some(Accumulator {
                    names: group_names.iter().map(|n| n.to_string()).collect(),
                    last_decl_end: map
                        .binding(*group.bindings.last().expect("group is non-empty"))
                        .decl_span
                        .end,
                    bindings: group.bindings,
                    boundary,
                });
            }
        }
    }

    flush(&mut acc, &mut out);
    out
}
