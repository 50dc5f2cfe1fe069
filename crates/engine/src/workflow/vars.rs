// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `$var` reference resolution against the workflow context.
//!
//! Only whole-string references substitute: `"$sessionId"` resolves,
//! `"id is $sessionId"` stays literal (no embedded interpolation).
//! Dotted paths traverse nested objects; unresolved references become
//! `null` rather than errors. Resolution is idempotent over literals.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Whole-string `$name` or `$name.path` reference.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$([A-Za-z_][\w.]*)$").expect("constant regex pattern is valid")
});

/// Resolve one input value against the context.
///
/// Strings that are whole-string references substitute; objects and
/// arrays resolve element-wise; everything else passes through.
pub fn resolve(value: &Value, context: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => match VAR_PATTERN.captures(s) {
            Some(caps) => lookup(context, &caps[1]).unwrap_or(Value::Null),
            None => value.clone(),
        },
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve(v, context)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| resolve(v, context)).collect())
        }
        _ => value.clone(),
    }
}

/// Resolve every field of a step input.
pub fn resolve_input(input: &Map<String, Value>, context: &Map<String, Value>) -> Map<String, Value> {
    input
        .iter()
        .map(|(k, v)| (k.clone(), resolve(v, context)))
        .collect()
}

/// Dotted-path lookup. `"a.b.c"` tries the literal key first (flat
/// contexts store dotted keys), then traverses nested objects.
pub fn lookup(context: &Map<String, Value>, path: &str) -> Option<Value> {
    if let Some(value) = context.get(path) {
        return Some(value.clone());
    }
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = context.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
