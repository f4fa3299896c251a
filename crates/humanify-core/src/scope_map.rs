//! Scope and binding arena for one parsed program.
//!
//! A `ScopeMap` is the normalized analysis output a language analyzer hands
//! to the engine: every lexical scope and every *binding* (declaration of a
//! name) with its references, stored in flat arenas and addressed by typed
//! ids. The engine mutates only `current_name`; all spans are byte offsets
//! into the original source and never change.
//!
//! Design notes:
//! - Scopes form a tree via `parent`; a name resolves to the innermost
//!   enclosing scope that declares it, and shadowing is permitted.
//! - Function and class *declarations* are owned by their enclosing scope
//!   (the scope their name is visible in), while `opened_scope` points at
//!   the scope the declaration opens. Grouping uses the owning scope, so a
//!   function is batched together with its siblings.
//! - Bindings deduplicate on `(owning scope span, declaration span)`: two
//!   bindings are the same binding iff they name the same declaration site.

use std::collections::HashMap;

use crate::text::Span;

// ============================================================================
// Ids
// ============================================================================

/// Unique identifier for a scope within one `ScopeMap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope_{}", self.0)
    }
}

/// Unique identifier for a binding within one `ScopeMap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

impl std::fmt::Display for BindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "binding_{}", self.0)
    }
}

// ============================================================================
// Scopes
// ============================================================================

/// The kind of lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Top level of the program.
    Program,
    /// Function, arrow function, or method body (parameters included).
    Function,
    /// Class body.
    Class,
    /// Block, `for` head, or `catch` clause.
    Block,
}

impl ScopeKind {
    /// Whether this scope kind bounds small-scope merging: merged batches
    /// never span two different program/function/class regions.
    pub fn is_merge_boundary(&self) -> bool {
        matches!(
            self,
            ScopeKind::Program | ScopeKind::Function | ScopeKind::Class
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Program => "program",
            ScopeKind::Function => "function",
            ScopeKind::Class => "class",
            ScopeKind::Block => "block",
        }
    }
}

/// One lexical scope.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// Byte span of the scope in the original source.
    pub span: Span,
    /// Parent scope; `None` only for the program scope.
    pub parent: Option<ScopeId>,
    /// Name of the function or class that opened this scope, if any.
    pub name: Option<String>,
    /// True for anonymous function expressions and arrow functions; context
    /// extraction climbs out of these before rendering.
    pub anonymous_expr: bool,
    /// Spans of the statements directly in this scope's body, in source
    /// order. Used by the context extractor's container fallback.
    pub body_stmts: Vec<Span>,
}

// ============================================================================
// Bindings and references
// ============================================================================

/// What kind of declaration produced a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Param,
    CatchParam,
    Import,
}

/// A non-declaration occurrence of a binding's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub span: Span,
    /// A shorthand object property (`{name}`); renames must expand it to
    /// `name: newName` to keep the property key intact.
    pub shorthand: bool,
}

/// Construction-time description of a binding.
#[derive(Debug, Clone)]
pub struct BindingSpec {
    pub name: String,
    pub kind: BindingKind,
    pub decl_span: Span,
    pub scope: ScopeId,
    pub opened_scope: Option<ScopeId>,
    pub stmt_span: Span,
    pub low_signal: bool,
    pub empty_catch: bool,
    pub shorthand_decl: bool,
}

impl BindingSpec {
    pub fn new(name: impl Into<String>, kind: BindingKind, decl_span: Span, scope: ScopeId) -> Self {
        BindingSpec {
            name: name.into(),
            kind,
            decl_span,
            scope,
            opened_scope: None,
            stmt_span: decl_span,
            low_signal: false,
            empty_catch: false,
            shorthand_decl: false,
        }
    }

    /// Point at the scope this declaration opens (functions and classes).
    pub fn with_opened_scope(mut self, scope: ScopeId) -> Self {
        self.opened_scope = Some(scope);
        self
    }

    /// Span of the statement the declaration appears in.
    pub fn with_stmt_span(mut self, span: Span) -> Self {
        self.stmt_span = span;
        self
    }

    /// Mark the declaration structurally trivial; the skip policy keeps it
    /// away from the LLM.
    pub fn low_signal(mut self) -> Self {
        self.low_signal = true;
        self
    }

    /// Mark a catch parameter whose catch body is empty.
    pub fn empty_catch(mut self) -> Self {
        self.empty_catch = true;
        self
    }

    /// Mark a shorthand destructuring declaration (`const {name} = ..`).
    pub fn shorthand(mut self) -> Self {
        self.shorthand_decl = true;
        self
    }
}

/// The declaration of a name in some lexical scope.
#[derive(Debug, Clone)]
pub struct Binding {
    pub id: BindingId,
    /// Name as originally declared. Never changes.
    pub original_name: String,
    /// Current name; updated when a rename is applied.
    pub current_name: String,
    pub kind: BindingKind,
    /// Span of the identifier at the declaration site.
    pub decl_span: Span,
    /// The scope the name is declared in (for function/class declarations,
    /// the *enclosing* scope).
    pub scope: ScopeId,
    /// The scope this declaration opens, for function and class
    /// declarations. Context extraction starts here so a function's own
    /// body is its primary context.
    pub opened_scope: Option<ScopeId>,
    /// Every non-declaration occurrence resolving to this binding.
    pub references: Vec<Reference>,
    /// Span of the statement the declaration appears in.
    pub stmt_span: Span,
    /// Structurally trivial declaration (empty function/class body, empty
    /// literal initializer, bare destructured element). Skipped without an
    /// LLM call.
    pub low_signal: bool,
    /// Catch parameter whose catch body has zero statements.
    pub empty_catch: bool,
    /// Shorthand destructuring declaration; renames expand the pattern.
    pub shorthand_decl: bool,
}

impl Binding {
    /// True if any rename has been applied to this binding.
    pub fn is_renamed(&self) -> bool {
        self.current_name != self.original_name
    }
}

// ============================================================================
// ScopeMap
// ============================================================================

/// Arena of scopes and bindings for one program.
#[derive(Debug, Clone, Default)]
pub struct ScopeMap {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    /// Postings: scope -> bindings declared directly in it.
    by_scope: HashMap<ScopeId, Vec<BindingId>>,
    /// Dedup index on (scope span, decl span).
    identity_index: HashMap<(Span, Span), BindingId>,
    source_len: u64,
}

impl ScopeMap {
    pub fn new(source_len: u64) -> Self {
        ScopeMap {
            source_len,
            ..ScopeMap::default()
        }
    }

    /// Length of the analyzed source in bytes.
    pub fn source_len(&self) -> u64 {
        self.source_len
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Add a scope and return its id. The first scope added must be the
    /// program scope.
    pub fn add_scope(
        &mut self,
        kind: ScopeKind,
        span: Span,
        parent: Option<ScopeId>,
        name: Option<String>,
        anonymous_expr: bool,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            span,
            parent,
            name,
            anonymous_expr,
            body_stmts: Vec::new(),
        });
        id
    }

    /// Record the body statement spans for a scope.
    pub fn set_body_stmts(&mut self, scope: ScopeId, stmts: Vec<Span>) {
        self.scopes[scope.0 as usize].body_stmts = stmts;
    }

    /// Add a binding, deduplicating on `(scope span, decl span)`. Returns
    /// the id of the new binding, or of the existing one if this
    /// declaration site was already recorded.
    pub fn add_binding(&mut self, spec: BindingSpec) -> BindingId {
        let scope_span = self.scopes[spec.scope.0 as usize].span;
        if let Some(existing) = self.identity_index.get(&(scope_span, spec.decl_span)) {
            return *existing;
        }
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(Binding {
            id,
            original_name: spec.name.clone(),
            current_name: spec.name,
            kind: spec.kind,
            decl_span: spec.decl_span,
            scope: spec.scope,
            opened_scope: spec.opened_scope,
            references: Vec::new(),
            stmt_span: spec.stmt_span,
            low_signal: spec.low_signal,
            empty_catch: spec.empty_catch,
            shorthand_decl: spec.shorthand_decl,
        });
        self.by_scope.entry(spec.scope).or_default().push(id);
        self.identity_index.insert((scope_span, spec.decl_span), id);
        id
    }

    /// Attach a reference to a binding.
    pub fn add_reference(&mut self, binding: BindingId, span: Span, shorthand: bool) {
        self.bindings[binding.0 as usize]
            .references
            .push(Reference { span, shorthand });
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0 as usize]
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// All bindings sorted by declaration byte offset.
    pub fn bindings_in_decl_order(&self) -> Vec<BindingId> {
        let mut ids: Vec<BindingId> = self.bindings.iter().map(|b| b.id).collect();
        ids.sort_by_key(|id| {
            let b = self.binding(*id);
            (b.decl_span.start, b.decl_span.end)
        });
        ids
    }

    /// Bindings declared directly in `scope`, in insertion order.
    pub fn bindings_of_scope(&self, scope: ScopeId) -> &[BindingId] {
        self.by_scope.get(&scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Does `scope` directly declare a binding currently named `name`?
    pub fn scope_has_binding_named(&self, scope: ScopeId, name: &str) -> bool {
        self.bindings_of_scope(scope)
            .iter()
            .any(|id| self.binding(*id).current_name == name)
    }

    /// Walk the scope chain from `scope` outward and return the innermost
    /// binding currently named `name`, if any.
    pub fn resolve_name(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if let Some(found) = self
                .bindings_of_scope(id)
                .iter()
                .find(|b| self.binding(**b).current_name == name)
            {
                return Some(*found);
            }
            cursor = self.scope(id).parent;
        }
        None
    }

    /// Nearest enclosing program/function/class scope, starting at `scope`
    /// itself. This is the merge-boundary key of the small-scope merger.
    pub fn merge_boundary(&self, scope: ScopeId) -> ScopeId {
        let mut cursor = scope;
        loop {
            let s = self.scope(cursor);
            if s.kind.is_merge_boundary() {
                return cursor;
            }
            match s.parent {
                Some(parent) => cursor = parent,
                None => return cursor,
            }
        }
    }

    /// Nearest scope `var` declarations hoist to: function or program.
    pub fn var_scope(&self, scope: ScopeId) -> ScopeId {
        let mut cursor = scope;
        loop {
            let s = self.scope(cursor);
            if matches!(s.kind, ScopeKind::Program | ScopeKind::Function) {
                return cursor;
            }
            match s.parent {
                Some(parent) => cursor = parent,
                None => return cursor,
            }
        }
    }

    /// The deepest scope whose span contains `offset`.
    pub fn innermost_scope_at(&self, offset: u64) -> ScopeId {
        let mut best = ScopeId(0);
        let mut best_len = u64::MAX;
        for scope in &self.scopes {
            if scope.span.contains_offset(offset) && scope.span.len() < best_len {
                best = scope.id;
                best_len = scope.span.len();
            }
        }
        best
    }

    /// The deepest scope whose span contains every given span.
    pub fn common_ancestor(&self, spans: &[Span]) -> ScopeId {
        let mut best = ScopeId(0);
        let mut best_len = u64::MAX;
        for scope in &self.scopes {
            if spans.iter().all(|s| scope.span.contains(s)) && scope.span.len() < best_len {
                best = scope.id;
                best_len = scope.span.len();
            }
        }
        best
    }

    /// Apply a rename to the in-memory model: update the binding's current
    /// name so later scope lookups and collision checks see it.
    pub fn set_current_name(&mut self, binding: BindingId, name: impl Into<String>) {
        self.bindings[binding.0 as usize].current_name = name.into();
    }

    /// Identity key for the visited set: `scope-span :: name :: decl-start`.
    pub fn identity_key(&self, binding: BindingId) -> String {
        let b = self.binding(binding);
        let scope_span = self.scope(b.scope).span;
        format!(
            "{}-{}::{}::{}",
            scope_span.start, scope_span.end, b.original_name, b.decl_span.start
        )
    }
}
