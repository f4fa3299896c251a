//! The renaming engine: orchestration of the full pipeline.
//!
//! One run is: analyze -> group -> merge -> split -> (cohort: extract
//! contexts, call visitors concurrently, apply in launch order) -> repeat,
//! checkpointing along the way.
//!
//! Concurrency model: the scope map and edit set are a single shared
//! resource. Context extraction for a cohort happens sequentially before
//! any visitor launches; while visitor calls are in flight the tree is
//! read-only; renames are applied sequentially in launch order after all
//! of the cohort's visitors return, so output order is deterministic even
//! when visitor completions race. Context extraction for the next cohort
//! does not begin until the current cohort's renames are applied.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::analyzer::ScopeAnalyzer;
use crate::batch::{split_batches, Batch};
use crate::checkpoint::{ResumeState, SidecarPaths};
use crate::context::ContextExtractor;
use crate::edit::EditSet;
use crate::error::{ConfigError, EngineError};
use crate::group::group_bindings;
use crate::merge::merge_small_groups;
use crate::names::{bump_suffix, is_builtin_global, normalize_identifier};
use crate::progress::{ProgressFn, ProgressReporter};
use crate::scope_map::{BindingId, ScopeMap};
use crate::skip;
use crate::text::{ceil_char_boundary, floor_char_boundary};
use crate::visitor::NameVisitor;

/// Hard ceiling on collision disambiguation retries. Exceeding it means
/// the input is pathological (tens of thousands of sibling bindings with
/// the same stem) and the run aborts.
pub const COLLISION_SANITY_BOUND: u32 = 10_000;

/// Checkpoint interval when no rename has landed since the last write.
const CLEAN_CHECKPOINT_INTERVAL: usize = 200;

// ============================================================================
// Options
// ============================================================================

/// Engine configuration. `new` applies the documented defaults; numeric
/// parameters are validated before any work happens.
#[derive(Debug, Clone)]
pub struct RenameOptions {
    /// Character budget for one prompt's code context.
    pub context_window_size: usize,
    /// Maximum identifiers per LLM call.
    pub max_batch_size: usize,
    /// Minimum line count considered enough context.
    pub min_information_score: usize,
    /// Require every handed-out name to be unique across the whole run.
    pub unique_names: bool,
    /// Visitor calls in flight at once.
    pub batch_concurrency: usize,
    /// Checkpoint every this many batches while renames are landing.
    pub dirty_checkpoint_interval: usize,
    /// Fold groups of at most this many bindings into shared batches;
    /// `0` disables merging.
    pub small_scope_merge_limit: usize,
    /// Where resume state lives (the sidecar is derived from this path).
    /// `None` disables checkpointing entirely.
    pub resume_path: Option<PathBuf>,
    /// The input file's path, used in sidecar derivation and validation.
    /// The engine never writes this file.
    pub file_path: Option<PathBuf>,
}

impl RenameOptions {
    pub fn new(context_window_size: usize) -> Self {
        RenameOptions {
            context_window_size,
            max_batch_size: 10,
            min_information_score: 16,
            unique_names: false,
            batch_concurrency: 1,
            dirty_checkpoint_interval: 50,
            small_scope_merge_limit: 2,
            resume_path: None,
            file_path: None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::NonPositiveBatchSize);
        }
        if self.batch_concurrency == 0 {
            return Err(ConfigError::NonPositiveConcurrency);
        }
        if self.context_window_size == 0 {
            return Err(ConfigError::NonPositiveContextWindow);
        }
        Ok(())
    }
}

// ============================================================================
// Run statistics
// ============================================================================

/// Per-run counters, logged at completion and handed to callers for
/// summary output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub batches: usize,
    pub visitor_calls: usize,
    pub renames_applied: usize,
    pub bindings_skipped: usize,
    pub checkpoints_written: usize,
}

// ============================================================================
// Ordered sets
// ============================================================================

/// Insertion-ordered string set: serialization stays deterministic while
/// membership checks stay O(1).
#[derive(Debug, Default)]
struct OrderedSet {
    items: Vec<String>,
    index: HashSet<String>,
}

impl OrderedSet {
    fn new() -> Self {
        OrderedSet::default()
    }

    fn from_items(items: Vec<String>) -> Self {
        let index = items.iter().cloned().collect();
        OrderedSet { items, index }
    }

    fn contains(&self, item: &str) -> bool {
        self.index.contains(item)
    }

    /// Insert, returning true if the item was new.
    fn insert(&mut self, item: String) -> bool {
        if self.index.insert(item.clone()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    fn items(&self) -> &[String] {
        &self.items
    }
}

// ============================================================================
// Engine
// ============================================================================

struct PreparedBatch {
    batch: Batch,
    names: Vec<String>,
    context: String,
}

/// The renaming engine over one analyzer and one visitor.
pub struct RenameEngine<A> {
    analyzer: A,
    visitor: Arc<dyn NameVisitor>,
    options: RenameOptions,
}

impl<A: ScopeAnalyzer> RenameEngine<A> {
    /// Build an engine, rejecting invalid options before any work.
    pub fn new(
        analyzer: A,
        visitor: Arc<dyn NameVisitor>,
        options: RenameOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(RenameEngine {
            analyzer,
            visitor,
            options,
        })
    }

    /// Run the engine over `source` and return the renamed text.
    pub async fn run(
        &self,
        source: &str,
        on_progress: Option<ProgressFn>,
    ) -> Result<String, EngineError> {
        self.run_with_stats(source, on_progress)
            .await
            .map(|(out, _)| out)
    }

    /// Run the engine and also return the run's counters.
    pub async fn run_with_stats(
        &self,
        source: &str,
        on_progress: Option<ProgressFn>,
    ) -> Result<(String, RunStats), EngineError> {
        let sidecar = self
            .options
            .resume_path
            .as_ref()
            .map(|r| SidecarPaths::derive(r, self.options.file_path.as_deref()));

        let mut visited = OrderedSet::new();
        let mut renames = OrderedSet::new();
        let mut start_index = 0usize;
        let mut working = source.to_string();
        // Whether the sidecar path holds state this run owns. A file that
        // failed validation is someone else's to inspect and never deleted.
        let mut owns_sidecar = false;

        if let Some(paths) = &sidecar {
            if let Some(state) = paths.load() {
                if self.state_matches_input(&state) {
                    info!(
                        current_index = state.current_index,
                        total = state.total_scopes,
                        "resuming from sidecar"
                    );
                    working = state.code;
                    visited = OrderedSet::from_items(state.visited);
                    renames = OrderedSet::from_items(state.renames);
                    start_index = state.current_index as usize;
                    owns_sidecar = true;
                } else {
                    warn!("sidecar belongs to a different input file, starting fresh");
                }
            }
        }

        let mut map = self.analyzer.analyze(&working)?;
        let total = map.binding_count();

        let groups = group_bindings(&map, &working);
        let merged = merge_small_groups(
            &map,
            groups,
            self.options.small_scope_merge_limit,
            self.options.max_batch_size,
        );
        let batches = split_batches(merged, self.options.max_batch_size);

        let mut stats = RunStats {
            batches: batches.len(),
            ..RunStats::default()
        };
        let mut edits = EditSet::new(working.clone());
        let mut progress = ProgressReporter::new(on_progress);

        // Seek past whole batches a prior run already applied; stragglers
        // inside a partially-applied batch are caught by the visited set.
        let mut pending: Vec<Batch> = Vec::new();
        let mut visited_count = 0usize;
        for batch in batches {
            if visited_count + batch.len() <= start_index {
                visited_count += batch.len();
                continue;
            }
            pending.push(batch);
        }
        progress.report(visited_count, total);

        let mut batch_iter = pending.into_iter();
        let mut since_checkpoint = 0usize;
        let mut dirty = false;
        let mut exhausted = false;

        while !exhausted {
            // ---- prepare a cohort; the tree is read-only from here until
            // ---- every visitor in the cohort has returned.
            let current = edits.materialize();
            let mut cohort: Vec<PreparedBatch> = Vec::new();
            while cohort.len() < self.options.batch_concurrency {
                let Some(batch) = batch_iter.next() else {
                    exhausted = true;
                    break;
                };

                let mut live: Vec<BindingId> = Vec::new();
                for id in &batch.bindings {
                    let key = map.identity_key(*id);
                    if visited.contains(&key) {
                        continue;
                    }
                    let binding = map.binding(*id);
                    let stmt = {
                        let mapped = edits.map_span(binding.stmt_span);
                        let lo = floor_char_boundary(&current, mapped.start as usize);
                        let hi = ceil_char_boundary(&current, mapped.end as usize);
                        &current[lo..hi]
                    };
                    if skip::is_low_signal(binding)
                        || skip::is_trivial_statement(stmt, &binding.current_name)
                    {
                        debug!(name = %binding.current_name, "skipping low-signal binding");
                        visited.insert(key);
                        visited_count += 1;
                        stats.bindings_skipped += 1;
                        continue;
                    }
                    live.push(*id);
                }

                if live.is_empty() {
                    progress.report(visited_count, total);
                    since_checkpoint += 1;
                    continue;
                }

                let extractor = ContextExtractor::new(
                    &map,
                    &edits,
                    &current,
                    self.options.context_window_size,
                    self.options.min_information_score,
                );
                let context = extractor.extract(&live);
                if skip::context_too_small(&context) {
                    for id in &live {
                        if visited.insert(map.identity_key(*id)) {
                            visited_count += 1;
                            stats.bindings_skipped += 1;
                        }
                    }
                    progress.report(visited_count, total);
                    since_checkpoint += 1;
                    continue;
                }

                let batch = Batch { bindings: live };
                let names = batch.names(&map);
                cohort.push(PreparedBatch {
                    batch,
                    names,
                    context,
                });
            }

            if cohort.is_empty() {
                break;
            }

            // ---- launch the cohort's visitor calls concurrently.
            stats.visitor_calls += cohort.len();
            let calls = cohort.iter().map(|prepared| {
                let visitor = Arc::clone(&self.visitor);
                let names = prepared.names.clone();
                let context = prepared.context.clone();
                async move { visitor.visit(&names, &context).await }
            });
            let results = join_all(calls).await;

            // ---- apply in launch order, regardless of completion order.
            for (prepared, result) in cohort.into_iter().zip(results) {
                match result {
                    Ok(mapping) => {
                        for id in &prepared.batch.bindings {
                            if self.apply_rename(&mut map, &mut edits, &mut renames, &mapping, *id)?
                            {
                                dirty = true;
                                stats.renames_applied += 1;
                            }
                            if visited.insert(map.identity_key(*id)) {
                                visited_count += 1;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "visitor failed, batch left unchanged");
                        for id in &prepared.batch.bindings {
                            if visited.insert(map.identity_key(*id)) {
                                visited_count += 1;
                            }
                        }
                    }
                }

                progress.report(visited_count, total);
                since_checkpoint += 1;

                if let Some(paths) = &sidecar {
                    let due = (dirty && since_checkpoint >= self.options.dirty_checkpoint_interval)
                        || (!dirty && since_checkpoint >= CLEAN_CHECKPOINT_INTERVAL);
                    if due {
                        let state = ResumeState {
                            code: edits.materialize(),
                            renames: renames.items().to_vec(),
                            visited: visited.items().to_vec(),
                            current_index: visited_count as u64,
                            total_scopes: total as u64,
                            code_path: self
                                .options
                                .file_path
                                .as_ref()
                                .map(|p| p.display().to_string())
                                .unwrap_or_default(),
                        };
                        match paths.save(&state) {
                            Ok(()) => {
                                since_checkpoint = 0;
                                dirty = false;
                                stats.checkpoints_written += 1;
                                owns_sidecar = true;
                            }
                            Err(e) => {
                                warn!(error = %e, "checkpoint write failed, will retry next interval");
                            }
                        }
                    }
                }
            }
        }

        let output = edits.materialize();
        progress.finish();

        if let Some(paths) = &sidecar {
            if owns_sidecar {
                if let Err(e) = paths.delete() {
                    warn!(error = %e, "could not delete sidecar after completion");
                }
            }
        }

        info!(
            batches = stats.batches,
            visitor_calls = stats.visitor_calls,
            renames = stats.renames_applied,
            skipped = stats.bindings_skipped,
            checkpoints = stats.checkpoints_written,
            "rename run complete"
        );
        Ok((output, stats))
    }

    /// Does the loaded state belong to the input we were asked to process?
    fn state_matches_input(&self, state: &ResumeState) -> bool {
        match (&self.options.file_path, state.code_path.is_empty()) {
            (Some(file), false) => {
                let ours = std::path::absolute(file)
                    .unwrap_or_else(|_| file.clone())
                    .display()
                    .to_string();
                let theirs = std::path::absolute(&state.code_path)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| state.code_path.clone());
                ours == theirs
            }
            _ => true,
        }
    }

    /// Apply one suggestion: normalize, resolve collisions, rewrite the
    /// declaration and every reference. Returns whether a rename landed.
    fn apply_rename(
        &self,
        map: &mut ScopeMap,
        edits: &mut EditSet,
        renames: &mut OrderedSet,
        mapping: &HashMap<String, String>,
        id: BindingId,
    ) -> Result<bool, EngineError> {
        let (old, scope, decl_span, shorthand_decl, references) = {
            let b = map.binding(id);
            (
                b.current_name.clone(),
                b.scope,
                b.decl_span,
                b.shorthand_decl,
                b.references.clone(),
            )
        };

        let Some(raw) = mapping.get(&old) else {
            return Ok(false);
        };
        if raw.trim().is_empty() || raw == &old {
            return Ok(false);
        }
        let Some(mut name) = normalize_identifier(raw) else {
            debug!(suggestion = %raw, "suggestion normalized to nothing, leaving binding alone");
            return Ok(false);
        };
        if name == old {
            return Ok(false);
        }

        let mut attempts = 0u32;
        while is_builtin_global(&name)
            || map.scope_has_binding_named(scope, &name)
            || (self.options.unique_names && renames.contains(&name))
        {
            name = bump_suffix(&name);
            attempts += 1;
            if attempts > COLLISION_SANITY_BOUND {
                return Err(EngineError::CollisionUnresolvable { name, attempts });
            }
        }

        // Shorthand object positions (`{old}`) expand to `old: new` so the
        // property key survives the rename.
        if shorthand_decl {
            edits.replace(decl_span, format!("{old}: {name}"))?;
        } else {
            edits.replace(decl_span, name.clone())?;
        }
        for reference in references {
            if reference.shorthand {
                edits.replace(reference.span, format!("{old}: {name}"))?;
            } else {
                edits.replace(reference.span, name.clone())?;
            }
        }
        map.set_current_name(id, name.clone());
        renames.insert(name);
        Ok(true)
    }
}
