// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ensure_builtin_installs_the_full_set() {
    let registry = OperationRegistry::new();
    registry.ensure_builtin();

    for id in [
        "highlight",
        "scroll",
        "click",
        "extract",
        "find-child",
        "type",
        "key",
        "navigate",
        "mouseMove",
        "mouseClick",
    ] {
        assert!(registry.get(id).is_some(), "missing builtin {id}");
    }
}

#[test]
fn ensure_builtin_is_idempotent() {
    let registry = OperationRegistry::new();
    registry.ensure_builtin();
    let count = registry.list().len();
    registry.ensure_builtin();
    assert_eq!(registry.list().len(), count);
}

#[test]
fn register_rejects_duplicates() {
    let registry = OperationRegistry::new();
    registry.ensure_builtin();

    struct Shadow;
    #[async_trait::async_trait]
    impl Operation for Shadow {
        fn id(&self) -> &'static str {
            "click"
        }
        fn required_capabilities(&self) -> &'static [&'static str] {
            &[]
        }
        async fn run(
            &self,
            _ctx: &OperationContext,
            _config: &Map<String, Value>,
        ) -> Result<Value, drover_core::Fault> {
            Ok(Value::Null)
        }
    }

    let err = registry.register(Arc::new(Shadow)).unwrap_err();
    assert!(matches!(err, RegistryError::Duplicate(id) if id == "click"));
}

#[test]
fn get_unknown_is_none() {
    let registry = OperationRegistry::new();
    assert!(registry.get("click").is_none());
}

#[test]
fn list_is_sorted() {
    let registry = OperationRegistry::new();
    registry.ensure_builtin();
    let ids = registry.list();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn global_registry_is_shared_and_initialized() {
    let a = OperationRegistry::global();
    let b = OperationRegistry::global();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(a.get("extract").is_some());
}

#[test]
fn declared_capabilities_match_contract() {
    let registry = OperationRegistry::new();
    registry.ensure_builtin();

    assert_eq!(registry.get("click").unwrap().required_capabilities(), &["click"]);
    assert_eq!(registry.get("extract").unwrap().required_capabilities(), &["extract"]);
    assert_eq!(registry.get("scroll").unwrap().required_capabilities(), &["scroll"]);
    assert_eq!(registry.get("type").unwrap().required_capabilities(), &["type"]);
    assert_eq!(registry.get("navigate").unwrap().required_capabilities(), &["navigate"]);
    assert!(registry.get("highlight").unwrap().required_capabilities().is_empty());
}
