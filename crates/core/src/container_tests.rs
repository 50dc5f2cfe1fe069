// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn snapshot_with(matched: &[&str], all: &[&str]) -> ContainerSnapshot {
    let instances = all
        .iter()
        .map(|id| ContainerInstance {
            id: InstanceId::new(),
            definition_id: id.to_string(),
            node_ref: matched.contains(id).then(|| format!("root/{id}")),
            selector: None,
            url: "https://www.xiaohongshu.com/".into(),
            match_count: usize::from(matched.contains(id)),
            parent_instance_id: None,
            children: Vec::new(),
        })
        .collect();
    ContainerSnapshot {
        url: "https://www.xiaohongshu.com/".into(),
        root_match: None,
        instances,
        dom_tree: None,
        matched_ids: matched.iter().map(|s| s.to_string()).collect(),
        signals: PageSignals::default(),
    }
}

#[test]
fn parent_id_follows_dot_paths() {
    let def = ContainerDefinition::builder().id("a.b.c").build();
    assert_eq!(def.parent_id(), Some("a.b"));

    let root = ContainerDefinition::builder().id("a").build();
    assert_eq!(root.parent_id(), None);
}

#[test]
fn is_root_requires_pattern() {
    let root = ContainerDefinition::builder()
        .id("home")
        .root_pattern("https://example.com/*")
        .build();
    assert!(root.is_root());
    assert!(!ContainerDefinition::builder().id("home.child").build().is_root());
}

#[test]
fn declares_operation_with_empty_list_allows_all() {
    let def = ContainerDefinition::builder().build();
    assert!(def.declares_operation("click"));
}

#[test]
fn declares_operation_with_list_is_closed() {
    let def = ContainerDefinition::builder()
        .operations(vec![OperationSpec::new("extract")])
        .build();
    assert!(def.declares_operation("extract"));
    assert!(!def.declares_operation("click"));
}

#[test]
fn default_config_for_declared_operation() {
    let mut config = serde_json::Map::new();
    config.insert("behavior".into(), json!("smooth"));
    let def = ContainerDefinition::builder()
        .operations(vec![OperationSpec::with_config("scroll", config)])
        .build();

    let defaults = def.default_config_for("scroll").unwrap();
    assert_eq!(defaults.get("behavior"), Some(&json!("smooth")));
    assert!(def.default_config_for("click").is_none());
}

#[test]
fn selector_variant_defaults_to_primary() {
    let sel: Selector = serde_json::from_value(json!({"css": ".x"})).unwrap();
    assert_eq!(sel.variant, SelectorVariant::Primary);
}

#[test]
fn definition_deserializes_from_library_json() {
    let def: ContainerDefinition = serde_json::from_value(json!({
        "id": "xiaohongshu_home.search_bar",
        "site": "xiaohongshu",
        "selectors": [
            {"css": "input#search-input"},
            {"css": ".search-input input", "variant": "fallback"}
        ],
        "capabilities": ["click", "type"],
        "operations": [{"type": "click"}]
    }))
    .unwrap();

    assert_eq!(def.parent_id(), Some("xiaohongshu_home"));
    assert!(def.has_capability("type"));
    assert_eq!(def.selectors[1].variant, SelectorVariant::Fallback);
    assert!(def.declares_operation("click"));
    assert!(!def.declares_operation("extract"));
}

#[test]
fn snapshot_matched_segment_checks_last_segment_only() {
    let snap = snapshot_with(
        &["xiaohongshu_home", "xiaohongshu_home.login_guard"],
        &["xiaohongshu_home", "xiaohongshu_home.login_guard", "xiaohongshu_home.login_anchor"],
    );
    assert!(snap.matched_segment("login_guard"));
    assert!(!snap.matched_segment("login_anchor"));
    // "guard" is not a full segment
    assert!(!snap.matched_segment("guard"));
}

#[test]
fn snapshot_retains_zero_match_candidates() {
    let snap = snapshot_with(&["a"], &["a", "a.missing"]);
    let absent = snap.instance_for("a.missing").unwrap();
    assert_eq!(absent.match_count, 0);
    assert!(absent.node_ref.is_none());
    assert!(snap.candidate_segment("missing"));
    assert!(!snap.matched("a.missing"));
}

#[test]
fn outcome_serializes_flat_fields() {
    let mut fields = std::collections::HashMap::new();
    fields.insert("session_id".to_string(), json!("s1"));
    let value = serde_json::to_value(Outcome::ok_with(fields)).unwrap();
    assert_eq!(value["success"], json!(true));
    assert_eq!(value["session_id"], json!("s1"));
}

#[test]
fn outcome_fail_carries_fault() {
    let outcome = Outcome::fail(crate::Fault::new(crate::ErrorKind::OperationFailed, "boom"));
    assert!(!outcome.success);
    assert_eq!(outcome.error.unwrap().kind, crate::ErrorKind::OperationFailed);
}
