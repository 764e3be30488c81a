//! End-to-end behavior of `normalize` over parsed schemas.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;
use schemanorm_core::{NormalizeError, Value};
use schemanorm_schema::{normalize, CustomTypeRegistry, NormalizerSpec, Schema, SchemaNormalizer};
use serde_json::json;

fn schema(json: serde_json::Value) -> Schema {
    Schema::from_value(&Value::from(json)).unwrap()
}

fn run(value: serde_json::Value, schema_json: serde_json::Value) -> Result<Value, NormalizeError> {
    normalize(&Value::from(value), &schema(schema_json))
}

#[test]
fn bool_is_not_coerced_from_int() {
    assert_eq!(run(json!(true), json!({"type": "bool"})).unwrap(), Value::Bool(true));
    assert!(run(json!(1), json!({"type": "bool"})).unwrap_err().is_validation_error());
}

#[test]
fn dict_requires_exact_key_set() {
    let dict = json!({
        "type": "dict",
        "properties": [
            {"name": "a", "schema": {"type": "int"}},
            {"name": "b", "schema": {"type": "unicode"}}
        ]
    });
    assert_eq!(
        run(json!({"a": 1, "b": "x"}), dict.clone()).unwrap(),
        Value::from(json!({"a": 1, "b": "x"}))
    );
    assert!(run(json!({"a": 1}), dict.clone()).unwrap_err().is_validation_error());
    assert!(run(json!({"a": 1, "b": "x", "c": 2}), dict).unwrap_err().is_validation_error());
}

#[test]
fn uniquify_sorts_and_dedups() {
    let out = run(
        json!([3, 1, 2, 1]),
        json!({"type": "list", "items": {"type": "int"}, "post_normalizers": [{"id": "uniquify"}]}),
    )
    .unwrap();
    assert_eq!(out, Value::from(json!([1, 2, 3])));
}

#[test]
fn normalize_spaces_collapses_runs() {
    let out = run(
        json!("  a   b  "),
        json!({"type": "unicode", "post_normalizers": [{"id": "normalize_spaces"}]}),
    )
    .unwrap();
    assert_eq!(out, Value::from("a b"));
}

#[test]
fn choice_violation_names_value_and_choices() {
    let err = run(json!(5), json!({"type": "int", "choices": [1, 2, 3]})).unwrap_err();
    let e = err.as_validation().unwrap();
    assert_eq!(
        e.message(),
        "Received 5 which is not in the allowed range of choices: [1, 2, 3]"
    );
}

#[test]
fn sanitize_url_accepts_http_and_rejects_javascript() {
    let url_schema = json!({"type": "unicode", "post_normalizers": [{"id": "sanitize_url"}]});
    assert!(run(json!("javascript:alert(1)"), url_schema.clone())
        .unwrap_err()
        .is_validation_error());
    assert_eq!(
        run(json!("http://example.com/a b"), url_schema).unwrap(),
        Value::from("http://example.com/a%20b")
    );
}

#[test]
fn list_length_is_checked_before_recursion() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let engine = SchemaNormalizer::new().with_custom_types(CustomTypeRegistry::new().with(
        "Counted",
        move |value: Value| -> Result<Value, String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        },
    ));
    let fixed = schema(json!({"type": "list", "items": {"type": "custom", "obj_type": "Counted"}, "len": 3}));

    let err = engine.normalize(&Value::from(json!([1, 2])), &fixed).unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    engine.normalize(&Value::from(json!([1, 2, 3])), &fixed).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn post_normalizers_stop_at_first_failure() {
    let bounded = schema(json!({
        "type": "int",
        "post_normalizers": [
            {"id": "require_at_least", "min_value": 0},
            {"id": "require_at_most", "max_value": 10}
        ]
    }));
    let err = normalize(&Value::Int(-1), &bounded).unwrap_err();
    assert!(err.as_validation().unwrap().message().contains("at least 0"));

    // An unknown second step would be a schema error if it were reached.
    let guarded = Schema::int()
        .with_post_normalizer(NormalizerSpec::new("require_at_least").with_arg("min_value", 0))
        .with_post_normalizer(NormalizerSpec::new("not_registered"));
    assert!(normalize(&Value::Int(-1), &guarded).unwrap_err().is_validation_error());
    assert!(normalize(&Value::Int(1), &guarded).unwrap_err().is_schema_error());
}

#[test]
fn error_kinds_are_distinct() {
    let unknown_type = Schema::from_value(&Value::from(json!({"type": "tuple"}))).unwrap_err();
    assert!(NormalizeError::from(unknown_type).is_schema_error());

    let unknown_id =
        Schema::from_value(&Value::from(json!({"type": "int", "post_normalizers": [{"id": "x"}]})))
            .unwrap_err();
    assert!(NormalizeError::from(unknown_id).is_schema_error());

    let empty = run(
        json!(""),
        json!({"type": "unicode", "post_normalizers": [{"id": "require_nonempty"}]}),
    )
    .unwrap_err();
    assert!(empty.is_validation_error());
}

#[test]
fn validation_error_path_points_at_element() {
    let err = run(
        json!({"a": [1, "two"]}),
        json!({"type": "dict", "properties": [{"name": "a", "schema": {"type": "list", "items": {"type": "int"}}}]}),
    )
    .unwrap_err();
    assert_eq!(err.as_validation().unwrap().path().to_string(), "/a/1");
}

#[test]
fn shared_schema_across_threads() {
    let shared = Arc::new(schema(json!({"type": "list", "items": {"type": "float"}})));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || normalize(&Value::from(json!([i, "1.5"])), &shared))
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let out = handle.join().unwrap().unwrap();
        assert_eq!(out, Value::from(json!([i as f64, 1.5])));
    }
}

fn text() -> impl Strategy<Value = String> {
    "[ a-zA-Z0-9_.]{0,16}"
}

proptest! {
    #[test]
    fn bool_idempotent(b in any::<bool>()) {
        let once = normalize(&Value::Bool(b), &Schema::bool()).unwrap();
        prop_assert_eq!(normalize(&once, &Schema::bool()).unwrap(), once);
    }

    #[test]
    fn int_idempotent(i in any::<i64>()) {
        let once = normalize(&Value::Int(i), &Schema::int()).unwrap();
        prop_assert_eq!(normalize(&once, &Schema::int()).unwrap(), once);
    }

    #[test]
    fn float_idempotent(f in -1.0e12f64..1.0e12) {
        let once = normalize(&Value::Float(f), &Schema::float()).unwrap();
        prop_assert_eq!(normalize(&once, &Schema::float()).unwrap(), once);
    }

    #[test]
    fn unicode_with_spaces_idempotent(s in text()) {
        let schema = Schema::unicode().with_post_normalizer(NormalizerSpec::new("normalize_spaces"));
        let once = normalize(&Value::from(s), &schema).unwrap();
        prop_assert_eq!(normalize(&once, &schema).unwrap(), once);
    }

    #[test]
    fn uniquified_list_idempotent(items in proptest::collection::vec(any::<i32>(), 0..12)) {
        let schema = Schema::list(Schema::int()).with_post_normalizer(NormalizerSpec::new("uniquify"));
        let value: Value = items.into_iter().map(Value::from).collect();
        let once = normalize(&value, &schema).unwrap();
        prop_assert_eq!(normalize(&once, &schema).unwrap(), once);
    }

    #[test]
    fn html_idempotent(s in "[<>/a-z \"=]{0,24}") {
        let once = normalize(&Value::from(s), &Schema::html()).unwrap();
        prop_assert_eq!(normalize(&once, &Schema::html()).unwrap(), once);
    }
}
