//! Identifier normalization and collision disambiguation.
//!
//! LLM answers are free text; before a suggestion becomes a rename it is
//! normalized to a legal JavaScript identifier, checked against reserved
//! words and the built-in global denylist, and disambiguated against names
//! already bound in the target scope.

use std::collections::HashSet;
use std::sync::OnceLock;

/// ECMAScript reserved words (including strict-mode and future reserved
/// words). A suggestion equal to one of these gets a leading underscore.
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Web and Node globals a rename must never introduce: shadowing one of
/// these silently changes program behavior.
const BUILTIN_GLOBALS: &[&str] = &[
    "AggregateError", "Array", "ArrayBuffer", "Atomics", "BigInt", "BigInt64Array",
    "BigUint64Array", "Boolean", "Buffer", "DataView", "Date", "Error", "EvalError",
    "FinalizationRegistry", "Float32Array", "Float64Array", "Function", "Infinity", "Int16Array",
    "Int32Array", "Int8Array", "Intl", "JSON", "Map", "Math", "NaN", "Number", "Object",
    "Promise", "Proxy", "RangeError", "ReferenceError", "Reflect", "RegExp", "Set",
    "SharedArrayBuffer", "String", "Symbol", "SyntaxError", "TypeError", "URIError", "URL",
    "URLSearchParams", "Uint16Array", "Uint32Array", "Uint8Array", "Uint8ClampedArray", "WeakMap",
    "WeakRef", "WeakSet", "XMLHttpRequest", "alert", "arguments", "atob", "btoa",
    "clearInterval", "clearTimeout", "console", "crypto", "document", "eval", "fetch", "global",
    "globalThis", "history", "localStorage", "location", "module", "navigator", "parseFloat",
    "parseInt", "process", "queueMicrotask", "require", "sessionStorage", "setInterval",
    "setTimeout", "structuredClone", "undefined", "window", "worker",
];

fn builtin_globals() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| BUILTIN_GLOBALS.iter().copied().collect())
}

fn reserved_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| RESERVED_WORDS.iter().copied().collect())
}

/// Is `name` a built-in Web/Node global that renames must avoid?
pub fn is_builtin_global(name: &str) -> bool {
    builtin_globals().contains(name)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Normalize a raw LLM suggestion into a legal identifier.
///
/// Invalid characters are dropped, a digit in the lead position gets an
/// underscore prefix, and reserved words get an underscore prefix. Returns
/// `None` when nothing usable remains, which the engine treats as "leave
/// this binding alone".
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if out.is_empty() {
            if is_ident_start(c) {
                out.push(c);
            } else if c.is_ascii_digit() {
                out.push('_');
                out.push(c);
            }
            // Anything else in the lead position is dropped.
        } else if is_ident_continue(c) {
            out.push(c);
        }
        // Interior punctuation and whitespace are dropped.
    }

    if out.is_empty() {
        return None;
    }
    if reserved_words().contains(out.as_str()) {
        out.insert(0, '_');
    }
    Some(out)
}

/// Deterministic collision suffix: trailing digits increment, otherwise a
/// `1` is appended (`foo` -> `foo1` -> `foo2` -> ... -> `foo9` -> `foo10`).
pub fn bump_suffix(name: &str) -> String {
    let digits_at = name
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let (stem, digits) = name.split_at(digits_at);
    if digits.is_empty() {
        return format!("{}1", name);
    }
    match digits.parse::<u64>() {
        Ok(n) => format!("{}{}", stem, n + 1),
        // Absurdly long digit runs fall back to appending.
        Err(_) => format!("{}1", name),
    }
}
