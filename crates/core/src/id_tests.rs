// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::RunId;

#[test]
fn short_truncates_long_strings() {
    assert_eq!(short("abcdefgh", 4), "abcd");
}

#[test]
fn short_keeps_short_strings() {
    assert_eq!(short("abc", 8), "abc");
}

#[test]
fn idbuf_roundtrips_str() {
    let buf = IdBuf::new("run-abc123");
    assert_eq!(buf.as_str(), "run-abc123");
    assert!(!buf.is_empty());
}

#[test]
fn idbuf_empty() {
    assert!(IdBuf::empty().is_empty());
    assert_eq!(IdBuf::empty().as_str(), "");
}

#[test]
fn generated_ids_carry_prefix_and_fit() {
    let id = RunId::new();
    assert!(id.as_str().starts_with("run-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn generated_ids_are_unique() {
    let a = RunId::new();
    let b = RunId::new();
    assert_ne!(a, b);
}

#[test]
fn suffix_strips_prefix() {
    let id = RunId::from_string("run-xyz");
    assert_eq!(id.suffix(), "xyz");
    assert_eq!(id.short(2), "xy");
}

#[test]
fn id_compares_with_str() {
    let id = RunId::from_string("run-xyz");
    assert_eq!(id, "run-xyz");
}

#[test]
fn idbuf_serde_roundtrip() {
    let id = RunId::from_string("run-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"run-xyz\"");
    let back: RunId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn idbuf_deserialize_rejects_oversized() {
    let long = format!("\"{}\"", "x".repeat(ID_MAX_LEN + 1));
    let result: Result<RunId, _> = serde_json::from_str(&long);
    assert!(result.is_err());
}
