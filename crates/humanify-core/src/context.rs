//! Context extraction: the code slice that accompanies a batch.
//!
//! For each batch the extractor produces a bounded textual window around
//! the targets, rendered from the *current* text so earlier renames are
//! visible in later prompts. The shape of the algorithm:
//!
//! 1. start at the first target's context scope (a function or class
//!    declaration contributes its own body; anything else its declaring
//!    scope), climbing out of anonymous function expressions and arrows;
//! 2. expand to parents until the rendered slice reaches the line-count
//!    information score or the program root;
//! 3. multi-target batches that land on the program root shrink back to the
//!    minimal common ancestor of all targets;
//! 4. a slice over the character budget falls back to the enclosing
//!    container's statement list, centered on the target statement and
//!    grown alternately backward/forward;
//! 5. program-level targets get a `// === Global References ===` section
//!    listing top-level statements that mention them, inside the remaining
//!    budget;
//! 6. every target gets a labelled excerpt so the model can locate it even
//!    if the shared window truncated it;
//! 7. single-target batches below the score get a `// Focus identifier:`
//!    hint.
//!
//! Target declarations are decorated with a trailing `/* Rename this NAME */`
//! comment during rendering only; the decoration never reaches the edit set.

use crate::edit::EditSet;
use crate::scope_map::{BindingId, ScopeId, ScopeKind, ScopeMap};
use crate::text::{ceil_char_boundary, floor_char_boundary, line_count, Span};

/// Floor for the per-target excerpt window, in bytes.
const MIN_SNIPPET_WINDOW: usize = 120;

pub struct ContextExtractor<'a> {
    map: &'a ScopeMap,
    edits: &'a EditSet,
    /// Materialized current text (edits applied).
    current: &'a str,
    /// Character budget for the shared slice.
    window: usize,
    /// Minimum line count considered informative.
    min_score: usize,
}

impl<'a> ContextExtractor<'a> {
    pub fn new(
        map: &'a ScopeMap,
        edits: &'a EditSet,
        current: &'a str,
        window: usize,
        min_score: usize,
    ) -> Self {
        ContextExtractor {
            map,
            edits,
            current,
            window,
            min_score,
        }
    }

    /// Produce the prompt context for a batch. The batch must be non-empty.
    pub fn extract(&self, batch: &[BindingId]) -> String {
        let first = batch[0];
        let mut p = self.context_scope_for(first);

        // Climb out of anonymous function expressions and arrows.
        while self.map.scope(p).anonymous_expr {
            match self.map.scope(p).parent {
                Some(parent) => p = parent,
                None => break,
            }
        }

        // Expand upward until the slice is informative enough.
        let mut shared = self.render_span(self.map.scope(p).span, batch);
        while line_count(&shared) < self.min_score {
            match self.map.scope(p).parent {
                Some(parent) => {
                    p = parent;
                    shared = self.render_span(self.map.scope(p).span, batch);
                }
                None => break,
            }
        }

        // A multi-target batch that escalated all the way to the program
        // shrinks back to the minimal common ancestor of its targets.
        if batch.len() > 1 && self.map.scope(p).parent.is_none() {
            let spans: Vec<Span> = batch
                .iter()
                .map(|b| self.map.binding(*b).decl_span)
                .collect();
            let ancestor = self.map.common_ancestor(&spans);
            if ancestor != p {
                p = ancestor;
                shared = self.render_span(self.map.scope(p).span, batch);
            }
        }

        // Over budget: rebuild from the container's statement list.
        if shared.len() > self.window {
            shared = self.container_fallback(p, first, batch);
        }

        let mut context = shared;

        if let Some(globals) = self.global_references(p, batch, context.len()) {
            context.push_str(&globals);
        }

        context.push_str(&self.target_snippets(batch));

        if batch.len() == 1 && line_count(&context) < self.min_score {
            let name = &self.map.binding(first).current_name;
            context.push_str(&format!("\n// Focus identifier: {name}"));
        }

        context
    }

    /// The scope whose rendering is the primary context for a binding: the
    /// scope a function/class declaration opens, otherwise the declaring
    /// scope.
    fn context_scope_for(&self, binding: BindingId) -> ScopeId {
        let b = self.map.binding(binding);
        b.opened_scope.unwrap_or(b.scope)
    }

    /// Render an original-offset span from the current text, decorating
    /// each target declaration inside it with a rename marker.
    fn render_span(&self, orig_span: Span, targets: &[BindingId]) -> String {
        let mapped = self.edits.map_span(orig_span);
        let lo = floor_char_boundary(self.current, mapped.start as usize);
        let hi = ceil_char_boundary(self.current, mapped.end as usize);
        let mut text = self.current[lo..hi].to_string();

        // Insertion points relative to the slice, applied back to front.
        let mut insertions: Vec<(usize, String)> = targets
            .iter()
            .filter_map(|t| {
                let b = self.map.binding(*t);
                if !orig_span.contains(&b.decl_span) {
                    return None;
                }
                let decl = self.edits.map_span(b.decl_span);
                let at = (decl.end as usize).checked_sub(lo)?;
                if at > text.len() {
                    return None;
                }
                Some((at, format!(" /* Rename this {} */", b.current_name)))
            })
            .collect();
        insertions.sort_by(|a, b| b.0.cmp(&a.0));
        for (at, marker) in insertions {
            if text.is_char_boundary(at) {
                text.insert_str(at, &marker);
            }
        }
        text
    }

    /// Budget fallback: the container's statement list, centered on the
    /// statement holding the first target, grown alternately backward and
    /// forward until the next addition would exceed the budget.
    fn container_fallback(&self, p: ScopeId, first: BindingId, targets: &[BindingId]) -> String {
        let mut container = p;
        while self.map.scope(container).body_stmts.is_empty() {
            match self.map.scope(container).parent {
                Some(parent) => container = parent,
                None => break,
            }
        }
        let stmts = &self.map.scope(container).body_stmts;
        if stmts.is_empty() {
            // Degenerate tree: hard-truncate the scope render.
            let rendered = self.render_span(self.map.scope(p).span, targets);
            let cut = floor_char_boundary(&rendered, self.window);
            return rendered[..cut].to_string();
        }

        let target_off = self.map.binding(first).decl_span.start;
        let center = stmts
            .iter()
            .position(|s| s.contains_offset(target_off))
            .unwrap_or_else(|| {
                // Nearest statement by start distance.
                stmts
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, s)| s.start.abs_diff(target_off))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            });

        let mut chosen = std::collections::VecDeque::new();
        let seed = self.render_span(stmts[center], targets);
        let mut used = seed.len();
        chosen.push_back(seed);

        let mut lo = center.checked_sub(1);
        let mut hi = if center + 1 < stmts.len() {
            Some(center + 1)
        } else {
            None
        };
        let mut backward = true;
        while lo.is_some() || hi.is_some() {
            let picked = if backward { lo } else { hi };
            backward = !backward;
            let Some(idx) = picked else { continue };
            let rendered = self.render_span(stmts[idx], targets);
            if used + rendered.len() + 1 > self.window {
                break;
            }
            used += rendered.len() + 1;
            if idx < center {
                chosen.push_front(rendered);
                lo = idx.checked_sub(1);
            } else {
                chosen.push_back(rendered);
                hi = if idx + 1 < stmts.len() {
                    Some(idx + 1)
                } else {
                    None
                };
            }
        }

        chosen.into_iter().collect::<Vec<_>>().join("\n")
    }

    /// For program-level targets, top-level statements referencing them,
    /// within the remaining budget. Statements already inside the shared
    /// context scope are skipped.
    fn global_references(
        &self,
        shared_scope: ScopeId,
        batch: &[BindingId],
        shared_len: usize,
    ) -> Option<String> {
        let program = self
            .map
            .scopes()
            .find(|s| s.parent.is_none())?
            .id;
        let program_stmts = &self.map.scope(program).body_stmts;
        let shared_span = self.map.scope(shared_scope).span;

        let mut remaining = self.window.saturating_sub(shared_len);
        let mut seen = std::collections::HashSet::new();
        let mut sections: Vec<String> = Vec::new();

        for target in batch {
            let b = self.map.binding(*target);
            if self.map.scope(b.scope).kind != ScopeKind::Program {
                continue;
            }
            for reference in &b.references {
                let Some(stmt) = program_stmts
                    .iter()
                    .find(|s| s.contains_offset(reference.span.start))
                else {
                    continue;
                };
                if shared_span.contains(stmt) && self.map.scope(shared_scope).kind != ScopeKind::Program
                {
                    continue;
                }
                if !seen.insert(*stmt) {
                    continue;
                }
                let rendered = self.render_span(*stmt, &[]);
                if rendered.len() + 1 > remaining {
                    continue;
                }
                remaining -= rendered.len() + 1;
                sections.push(rendered);
            }
        }

        if sections.is_empty() {
            return None;
        }
        Some(format!(
            "\n// === Global References ===\n{}",
            sections.join("\n")
        ))
    }

    /// Labelled excerpt per target: header, a bounded slice centered on the
    /// declaration, and an ellipsis line.
    fn target_snippets(&self, batch: &[BindingId]) -> String {
        let per_target = MIN_SNIPPET_WINDOW.max(self.window / batch.len().max(1));
        let mut out = String::new();
        for target in batch {
            let b = self.map.binding(*target);
            let decl = self.edits.map_span(b.decl_span);
            let half = per_target / 2;
            let lo = floor_char_boundary(
                self.current,
                (decl.start as usize).saturating_sub(half),
            );
            let hi = ceil_char_boundary(self.current, decl.end as usize + half);
            out.push_str(&format!(
                "\n// Target: {}\n{}\n// ...",
                b.current_name,
                &self.current[lo..hi]
            ));
        }
        out
    }
}
