//! Low-signal skip: bindings not worth an LLM round-trip.
//!
//! Three classes of binding are marked visited without a visitor call:
//!
//! - empty `catch` parameters whose body has zero statements;
//! - structurally trivial declarations (empty function/class bodies, empty
//!   literal initializers, bare destructured elements);
//! - batches whose extracted context is under
//!   [`MIN_CONTEXT_SIGNIFICANCE`] non-whitespace characters.
//!
//! The first two are structural facts the analyzer records; the statement
//! text check backs them up for analyzers that do not flag every form.

use crate::scope_map::Binding;
use crate::text::non_whitespace_len;

/// Minimum non-whitespace length of a context worth sending to the model.
pub const MIN_CONTEXT_SIGNIFICANCE: usize = 10;

/// Flag-based check used by the merger and the engine: is this binding
/// skippable on structure alone?
pub fn is_low_signal(binding: &Binding) -> bool {
    binding.low_signal || binding.empty_catch
}

/// Is an extracted context too small to be useful?
pub fn context_too_small(context: &str) -> bool {
    non_whitespace_len(context) < MIN_CONTEXT_SIGNIFICANCE
}

/// Textual backstop for trivial single-statement declarations:
/// `X = ""`, `X = {}`, `X = []`, `[X]`, `function N(){}`, `function N(x){}`,
/// `class N {}`, `catch(X){}`.
pub fn is_trivial_statement(stmt: &str, name: &str) -> bool {
    let compact: String = stmt.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.trim_end_matches(';');
    let body = compact
        .strip_prefix("var")
        .or_else(|| compact.strip_prefix("let"))
        .or_else(|| compact.strip_prefix("const"))
        // Only treat the keyword as a prefix if what follows is the name,
        // so a binding called `variable` is not mangled into `iable`.
        .filter(|rest| rest.starts_with(name))
        .unwrap_or(compact);

    if body == format!("{name}=\"\"")
        || body == format!("{name}=''")
        || body == format!("{name}={{}}")
        || body == format!("{name}=[]")
        || body == format!("[{name}]")
        || body == format!("function{name}(){{}}")
        || body == format!("class{name}{{}}")
        || body == format!("catch({name}){{}}")
    {
        return true;
    }

    // `function N(x){}` with exactly one identifier parameter. Both the
    // function name and the parameter count as trivial.
    if let Some(rest) = body.strip_prefix(&format!("function{name}(")) {
        if let Some(param) = rest.strip_suffix("){}") {
            return !param.is_empty()
                && param
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$');
        }
    }
    if body.starts_with("function") && body.ends_with(&format!("({name}){{}}")) {
        return true;
    }

    false
}
