// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use serde_json::json;
use yare::parameterized;

fn context(value: serde_json::Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn whole_string_reference_substitutes() {
    let ctx = context(json!({"sessionId": "s1"}));
    assert_eq!(resolve(&json!("$sessionId"), &ctx), json!("s1"));
}

#[test]
fn embedded_reference_stays_literal() {
    // Only whole-string references substitute; no ${...} interpolation.
    let ctx = context(json!({"sessionId": "s1"}));
    assert_eq!(
        resolve(&json!("session is $sessionId"), &ctx),
        json!("session is $sessionId")
    );
}

#[test]
fn unresolved_reference_becomes_null() {
    let ctx = context(json!({}));
    assert_eq!(resolve(&json!("$missing"), &ctx), Value::Null);
}

#[test]
fn null_values_are_preserved() {
    // A key that exists with a null value resolves to null, same shape as
    // an unresolved reference but deliberate.
    let ctx = context(json!({"sessionId": null}));
    assert_eq!(resolve(&json!("$sessionId"), &ctx), Value::Null);
}

#[test]
fn dotted_path_traverses_nested_objects() {
    let ctx = context(json!({"note": {"author": {"name": "客"}}}));
    assert_eq!(resolve(&json!("$note.author.name"), &ctx), json!("客"));
}

#[test]
fn flat_dotted_key_wins_over_traversal() {
    let ctx = context(json!({"note.author": "flat", "note": {"author": "nested"}}));
    assert_eq!(resolve(&json!("$note.author"), &ctx), json!("flat"));
}

#[test]
fn non_string_values_pass_through() {
    let ctx = context(json!({"x": 1}));
    assert_eq!(resolve(&json!(42), &ctx), json!(42));
    assert_eq!(resolve(&json!(true), &ctx), json!(true));
    assert_eq!(resolve(&Value::Null, &ctx), Value::Null);
}

#[test]
fn objects_and_arrays_resolve_element_wise() {
    let ctx = context(json!({"kw": "手机壳", "sid": "s1"}));
    let input = json!({
        "query": "$kw",
        "nested": {"session": "$sid"},
        "list": ["$kw", "literal"]
    });
    assert_eq!(
        resolve(&input, &ctx),
        json!({
            "query": "手机壳",
            "nested": {"session": "s1"},
            "list": ["手机壳", "literal"]
        })
    );
}

#[parameterized(
    bare_dollar = { "$" },
    digit_start = { "$1abc" },
    dollar_brace = { "${x}" },
    trailing_space = { "$x " },
)]
fn malformed_references_stay_literal(raw: &str) {
    let ctx = context(json!({"x": "v", "1abc": "v"}));
    assert_eq!(resolve(&json!(raw), &ctx), json!(raw));
}

#[test]
fn resolve_input_resolves_every_field() {
    let ctx = context(json!({"sessionId": "s1"}));
    let input = context(json!({"sid": "$sessionId", "fixed": 7}));
    let resolved = resolve_input(&input, &ctx);
    assert_eq!(resolved.get("sid"), Some(&json!("s1")));
    assert_eq!(resolved.get("fixed"), Some(&json!(7)));
}

#[test]
fn lookup_missing_is_none() {
    let ctx = context(json!({"a": {"b": 1}}));
    assert!(lookup(&ctx, "a.c").is_none());
    assert!(lookup(&ctx, "z").is_none());
    assert_eq!(lookup(&ctx, "a.b"), Some(json!(1)));
}

proptest! {
    /// Resolving a context-free literal is a no-op, and resolving twice
    /// equals resolving once.
    #[test]
    fn resolution_is_idempotent_over_literals(s in "[a-zA-Z0-9 .{}]{0,24}") {
        let ctx = context(json!({}));
        let value = json!(s);
        let once = resolve(&value, &ctx);
        let twice = resolve(&once, &ctx);
        // Unresolved $refs become null; everything else is untouched.
        prop_assert_eq!(once.clone(), twice);
        if !s.starts_with('$') {
            prop_assert_eq!(once, value);
        }
    }
}
