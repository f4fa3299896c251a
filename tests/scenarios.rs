//! End-to-end scenarios over the real JavaScript analyzer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use humanify::{rename, FnVisitor, IdentityVisitor, NameVisitor, RenameOptions};
use humanify_core::checkpoint::{ResumeState, SidecarPaths};

fn options() -> RenameOptions {
    RenameOptions::new(4_000)
}

/// A visitor that applies a fixed mapping and records every batch it sees.
struct RecordingVisitor {
    mapping: HashMap<String, String>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl RecordingVisitor {
    fn new(pairs: &[(&str, &str)]) -> (Self, Arc<Mutex<Vec<Vec<String>>>>) {
        let batches = Arc::new(Mutex::new(Vec::new()));
        (
            RecordingVisitor {
                mapping: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                batches: Arc::clone(&batches),
            },
            batches,
        )
    }
}

#[async_trait::async_trait]
impl NameVisitor for RecordingVisitor {
    async fn visit(
        &self,
        names: &[String],
        _context: &str,
    ) -> Result<HashMap<String, String>, humanify::VisitorError> {
        self.batches.lock().unwrap().push(names.to_vec());
        Ok(names
            .iter()
            .map(|n| {
                let new = self.mapping.get(n).cloned().unwrap_or_else(|| n.clone());
                (n.clone(), new)
            })
            .collect())
    }
}

// ============================================================================
// Literal scenarios
// ============================================================================

#[tokio::test]
async fn single_binding_renamed() {
    let visitor = FnVisitor(|names: &[String], _: &str| {
        names.iter().map(|n| (n.clone(), "b".to_string())).collect()
    });
    let out = rename("const a = 1;", Arc::new(visitor), options(), None)
        .await
        .unwrap();
    assert_eq!(out, "const b = 1;");
}

#[tokio::test]
async fn second_colliding_binding_takes_a_suffix() {
    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| (n.clone(), "foo".to_string()))
            .collect()
    });
    let out = rename(
        "const a=1; const b=1;",
        Arc::new(visitor),
        options(),
        None,
    )
    .await
    .unwrap();
    assert_eq!(out, "const foo=1; const foo1=1;");
}

#[tokio::test]
async fn class_methods_are_not_renamed() {
    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| (n.clone(), format!("_{n}")))
            .collect()
    });
    let out = rename(
        "class Foo { bar() {} }",
        Arc::new(visitor),
        options(),
        None,
    )
    .await
    .unwrap();
    assert_eq!(out, "class _Foo { bar() {} }");
}

#[tokio::test]
async fn arguments_pseudo_binding_is_untouched() {
    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| (n.clone(), "foobar".to_string()))
            .collect()
    });
    let out = rename(
        "function foo(){ arguments = \"x\"; }",
        Arc::new(visitor),
        options(),
        None,
    )
    .await
    .unwrap();
    assert_eq!(out, "function foobar(){ arguments = \"x\"; }");
}

#[tokio::test]
async fn locals_of_different_functions_never_share_a_call() {
    let (visitor, batches) = RecordingVisitor::new(&[
        ("one", "first"),
        ("two", "second"),
        ("a", "left"),
        ("b", "right"),
    ]);
    let source = "function one(){const a=1;return a} function two(){const b=2;return b}";
    let out = rename(source, Arc::new(visitor), options(), None)
        .await
        .unwrap();

    let batches = batches.lock().unwrap();
    for batch in batches.iter() {
        assert!(
            !(batch.contains(&"a".to_string()) && batch.contains(&"b".to_string())),
            "cross-function merge is forbidden, got batch {batch:?}"
        );
    }
    let calls_with_locals = batches
        .iter()
        .filter(|b| b.contains(&"a".to_string()) || b.contains(&"b".to_string()))
        .count();
    assert_eq!(calls_with_locals, 2);
    assert!(out.contains("function first()"));
    assert!(out.contains("return left"));
}

#[tokio::test]
async fn empty_catch_parameter_is_skipped() {
    let (visitor, batches) = RecordingVisitor::new(&[("f", "run")]);
    let source = "function f() { try { g(); } catch(z) {} }";
    let out = rename(source, Arc::new(visitor), options(), None)
        .await
        .unwrap();

    let batches = batches.lock().unwrap();
    assert!(
        batches.iter().all(|b| !b.contains(&"z".to_string())),
        "no LLM call may name z"
    );
    assert!(out.contains("catch(z)"), "z stays in place: {out}");
}

#[tokio::test]
async fn resume_file_is_never_touched_and_no_sidecar_survives() {
    let dir = tempfile::TempDir::new().unwrap();
    let resume = dir.path().join("out.js");
    std::fs::write(&resume, "const untouched = 1;\n").unwrap();

    let mut options = options();
    options.resume_path = Some(resume.clone());

    let out = rename("const a = 1;", Arc::new(IdentityVisitor), options, None)
        .await
        .unwrap();
    assert_eq!(out, "const a = 1;");

    assert_eq!(
        std::fs::read_to_string(&resume).unwrap(),
        "const untouched = 1;\n",
        "the resume file itself must stay byte-identical"
    );
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.contains("humanify-resume"))
        .collect();
    assert!(leftovers.is_empty(), "sidecars left behind: {leftovers:?}");
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn identity_visitor_is_idempotent() {
    let source = "function process(input) { const result = input * 2; return result; }";
    let out = rename(source, Arc::new(IdentityVisitor), options(), None)
        .await
        .unwrap();
    assert_eq!(out, source);
}

#[tokio::test]
async fn sequential_runs_are_deterministic() {
    let visitor = || {
        FnVisitor(|names: &[String], _: &str| {
            names
                .iter()
                .map(|n| (n.clone(), format!("renamed_{n}")))
                .collect()
        })
    };
    let source = "const a = 1; function f(x) { let y = x + a; return y; } f(a);";
    let first = rename(source, Arc::new(visitor()), options(), None)
        .await
        .unwrap();
    let second = rename(source, Arc::new(visitor()), options(), None)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn colliding_runs_produce_identical_suffixes() {
    let visitor = || {
        FnVisitor(|names: &[String], _: &str| {
            names
                .iter()
                .map(|n| (n.clone(), "foo".to_string()))
                .collect()
        })
    };
    let source = "const a=1; const b=1; const c=1;";
    let first = rename(source, Arc::new(visitor()), options(), None)
        .await
        .unwrap();
    let second = rename(source, Arc::new(visitor()), options(), None)
        .await
        .unwrap();
    assert_eq!(first, "const foo=1; const foo1=1; const foo2=1;");
    assert_eq!(first, second);
}

#[tokio::test]
async fn shadowing_is_preserved() {
    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| {
                let new = if n == "x" { "value" } else { n.as_str() };
                (n.clone(), new.to_string())
            })
            .collect()
    });
    let source = "let x = 1; function f(x) { return x; } use(x);";
    let out = rename(source, Arc::new(visitor), options(), None)
        .await
        .unwrap();
    // Inner scope first: the parameter and the outer let both become
    // `value`; the inner reference still resolves to the parameter.
    assert_eq!(out, "let value = 1; function f(value) { return value; } use(value);");
}

#[tokio::test]
async fn references_follow_their_binding() {
    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| {
                let new = if n == "cb" { "callback" } else { n.as_str() };
                (n.clone(), new.to_string())
            })
            .collect()
    });
    let source = "function run(cb) { if (cb) { cb(1); } return cb; }";
    let out = rename(source, Arc::new(visitor), options(), None)
        .await
        .unwrap();
    assert_eq!(
        out,
        "function run(callback) { if (callback) { callback(1); } return callback; }"
    );
}

#[tokio::test]
async fn shorthand_properties_expand_on_rename() {
    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| {
                let new = if n == "id" { "userId" } else { n.as_str() };
                (n.clone(), new.to_string())
            })
            .collect()
    });
    let source = "function make(id) { return { id }; }";
    let out = rename(source, Arc::new(visitor), options(), None)
        .await
        .unwrap();
    assert_eq!(out, "function make(userId) { return { id: userId }; }");
}

#[tokio::test]
async fn unique_names_mode_never_reuses_a_name() {
    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| (n.clone(), "item".to_string()))
            .collect()
    });
    let mut options = options();
    options.unique_names = true;
    // Two separate functions, so scope checks alone would allow both to
    // be called `item`.
    let source = "function f(){const a=1;return a+a} function g(){const b=2;return b+b}";
    let out = rename(source, Arc::new(visitor), options, None)
        .await
        .unwrap();
    assert!(out.contains("item"));
    assert!(out.contains("item1"), "second scope must get a suffix: {out}");
}

#[tokio::test]
async fn concurrent_cohorts_apply_in_launch_order() {
    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| (n.clone(), "shared".to_string()))
            .collect()
    });
    let mut options = options();
    options.batch_concurrency = 4;
    options.unique_names = true;
    options.small_scope_merge_limit = 0;
    let source = "function f(){const a=1;return a} function g(){const b=2;return b} function h(){const c=3;return c}";
    let out = rename(source, Arc::new(visitor), options, None)
        .await
        .unwrap();
    // Suffixes are assigned in batch sort order (f's local, then g's,
    // then h's), not in visitor completion order.
    assert!(out.contains("const shared=1"), "{out}");
    assert!(out.contains("const shared1=2"), "{out}");
    assert!(out.contains("const shared2=3"), "{out}");
}

#[tokio::test]
async fn config_validation_rejects_before_any_work() {
    let mut bad = options();
    bad.max_batch_size = 0;
    let err = rename("const a = 1;", Arc::new(IdentityVisitor), bad, None)
        .await
        .unwrap_err();
    assert!(matches!(err, humanify::EngineError::Config(_)));

    let mut bad = options();
    bad.batch_concurrency = 0;
    assert!(rename("const a = 1;", Arc::new(IdentityVisitor), bad, None)
        .await
        .is_err());
}

#[tokio::test]
async fn parse_errors_are_fatal() {
    let err = rename("const = (", Arc::new(IdentityVisitor), options(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, humanify::EngineError::Parse(_)));
}

// ============================================================================
// Resume behavior
// ============================================================================

#[tokio::test]
async fn resume_state_takes_over_from_the_sidecar() {
    let dir = tempfile::TempDir::new().unwrap();
    let resume = dir.path().join("out.js");

    // A previous run got halfway: it renamed `a` to `alpha` and recorded
    // one visited binding.
    let paths = SidecarPaths::derive(&resume, None);
    let halfway = ResumeState {
        code: "const alpha = 1; const b = alpha;".to_string(),
        renames: vec!["alpha".to_string()],
        visited: vec!["0-33::a::6".to_string()],
        current_index: 1,
        total_scopes: 2,
        code_path: String::new(),
    };
    paths.save(&halfway).unwrap();

    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| {
                let new = if n == "b" { "beta" } else { n.as_str() };
                (n.clone(), new.to_string())
            })
            .collect()
    });
    let mut options = options();
    options.resume_path = Some(resume.clone());
    // The original input is ignored in favor of the sidecar's code.
    let out = rename("const a = 1; const b = a;", Arc::new(visitor), options, None)
        .await
        .unwrap();
    assert_eq!(out, "const alpha = 1; const beta = alpha;");
    assert!(!paths.exists(), "sidecar deleted after completion");
}

#[tokio::test]
async fn corrupt_sidecar_starts_fresh_and_is_kept() {
    let dir = tempfile::TempDir::new().unwrap();
    let resume = dir.path().join("out.js");
    let paths = SidecarPaths::derive(&resume, None);
    std::fs::write(paths.write_path(), b"{ not json ").unwrap();

    let visitor = FnVisitor(|names: &[String], _: &str| {
        names
            .iter()
            .map(|n| (n.clone(), format!("{n}_renamed")))
            .collect()
    });
    let mut options = options();
    options.resume_path = Some(resume.clone());
    let out = rename("const a = 1;", Arc::new(visitor), options, None)
        .await
        .unwrap();
    assert_eq!(out, "const a_renamed = 1;");
    assert!(
        paths.write_path().exists(),
        "a sidecar that failed validation is kept for inspection"
    );
}
