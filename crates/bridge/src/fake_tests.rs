// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[tokio::test]
async fn unhandled_methods_answer_null() {
    let bridge = FakeBridge::new();
    let result = bridge.call("keyboard:press", json!({})).await.unwrap();
    assert_eq!(result, Value::Null);
}

#[tokio::test]
async fn respond_returns_fixed_value() {
    let bridge = FakeBridge::new();
    bridge.respond("session:list", json!({"profiles": ["a"]}));
    let result = bridge.call("session:list", json!({})).await.unwrap();
    assert_eq!(result["profiles"][0], json!("a"));
}

#[tokio::test]
async fn handler_sees_params() {
    let bridge = FakeBridge::new();
    bridge.handle("evaluate", |params| {
        Ok(json!({ "echo": params["script"] }))
    });
    let result = bridge
        .call("evaluate", json!({"script": "x"}))
        .await
        .unwrap();
    assert_eq!(result["echo"], json!("x"));
}

#[tokio::test]
async fn fail_with_and_recover() {
    let bridge = FakeBridge::new();
    bridge.fail_with("jitter");
    let err = bridge.call("evaluate", json!({})).await.unwrap_err();
    assert!(matches!(err, BridgeError::Remote(m) if m == "jitter"));

    bridge.recover();
    assert!(bridge.call("evaluate", json!({})).await.is_ok());
}

#[tokio::test]
async fn calls_are_recorded_in_order() {
    let bridge = FakeBridge::new();
    bridge.call("a", json!(1)).await.unwrap();
    bridge.call("b", json!(2)).await.unwrap();
    bridge.call("a", json!(3)).await.unwrap();

    let methods: Vec<String> = bridge.calls().into_iter().map(|(m, _)| m).collect();
    assert_eq!(methods, vec!["a", "b", "a"]);
    assert_eq!(bridge.calls_for("a"), vec![json!(1), json!(3)]);
}
