// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bus::EventBus;
use drover_bridge::{BridgeContextProvider, FakeBridge};
use drover_core::test_support::write_container;
use drover_core::SystemClock;
use serde_json::json;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    bus: Arc<EventBus>,
    queue: OperationQueue<SystemClock>,
    dispatcher: Arc<Dispatcher<SystemClock>>,
    bridge: FakeBridge,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    write_container(
        &dir.path().join("xiaohongshu").join("card"),
        &json!({
            "id": "card",
            "site": "xiaohongshu",
            "root_pattern": "https://www.xiaohongshu.com/*",
            "selectors": [{"css": "section.card"}],
            "capabilities": ["extract", "scroll"],
            "operations": [
                {"type": "extract", "config": {"fields": {"title": ".title"}}},
                {"type": "scroll", "config": {"dy": 300}}
            ]
        }),
    );
    write_container(
        &dir.path().join("xiaohongshu").join("plain"),
        &json!({
            "id": "plain",
            "site": "xiaohongshu",
            "root_pattern": "https://www.xiaohongshu.com/plain*",
            "selectors": [{"css": "#plain"}],
            "capabilities": ["extract"]
        }),
    );
    let library = Arc::new(ContainerLibrary::new(dir.path()));
    library.load().unwrap();

    let registry = Arc::new(OperationRegistry::new());
    registry.ensure_builtin();
    let bus = Arc::new(EventBus::new());
    let queue = OperationQueue::new(registry.clone(), bus.clone(), SystemClock);
    let bridge = FakeBridge::new();
    queue.set_context_provider(Arc::new(BridgeContextProvider::new(Arc::new(bridge.clone()))));

    let dispatcher = Arc::new(Dispatcher::new(queue.clone(), library, registry));
    Fixture { _dir: dir, bus, queue, dispatcher, bridge }
}

fn extract_rule(event: &str) -> WorkflowRule {
    WorkflowRule {
        container: "card".into(),
        triggers: vec![WorkflowTrigger::new(
            event,
            vec![TriggerOperation::new("extract")],
        )],
    }
}

#[tokio::test]
async fn valid_rule_registers() {
    let f = fixture();
    f.dispatcher.register(extract_rule("page:loaded")).unwrap();
    assert_eq!(f.dispatcher.rule_count(), 1);
}

#[tokio::test]
async fn rule_with_undeclared_operation_rejected_at_registration() {
    let f = fixture();
    // "card" declares extract and scroll; highlight is not listed.
    let err = f
        .dispatcher
        .register(WorkflowRule {
            container: "card".into(),
            triggers: vec![WorkflowTrigger::new(
                "page:loaded",
                vec![TriggerOperation::new("highlight")],
            )],
        })
        .unwrap_err();
    assert!(matches!(err, BindingError::OperationNotDeclared { .. }));
    assert_eq!(f.dispatcher.rule_count(), 0);
}

#[tokio::test]
async fn rule_missing_capability_rejected_at_registration() {
    let f = fixture();
    // "plain" has extract capability only; scroll cannot be declared.
    let err = f
        .dispatcher
        .register(WorkflowRule {
            container: "plain".into(),
            triggers: vec![WorkflowTrigger::new(
                "page:loaded",
                vec![TriggerOperation::new("scroll")],
            )],
        })
        .unwrap_err();
    assert!(matches!(err, BindingError::CapabilityMissing { .. }));
}

#[tokio::test]
async fn rule_with_unknown_container_rejected() {
    let f = fixture();
    assert!(f.dispatcher.register(extract_rule_for("ghost")).is_err());

    fn extract_rule_for(container: &str) -> WorkflowRule {
        WorkflowRule {
            container: container.into(),
            triggers: vec![WorkflowTrigger::new(
                "page:loaded",
                vec![TriggerOperation::new("extract")],
            )],
        }
    }
}

#[tokio::test]
async fn matching_event_enqueues_operations() {
    let f = fixture();
    f.bridge.respond("evaluate", json!([{"title": "t"}]));
    f.dispatcher.register(extract_rule("page:*")).unwrap();

    f.dispatcher
        .dispatch(&BusEvent {
            topic: "page:loaded".into(),
            payload: json!({"profile": "p-1"}),
        })
        .await;

    // Wait for the queued task to drain.
    for _ in 0..100 {
        if !f.bridge.calls_for("evaluate").is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    let call = &f.bridge.calls_for("evaluate")[0];
    // Default config flowed in from the container declaration.
    assert_eq!(call["args"][2], json!("section.card"));
    assert_eq!(call["args"][3]["title"], json!(".title"));
}

#[tokio::test]
async fn payload_node_refs_are_injected_into_config() {
    let f = fixture();
    f.bridge.respond("evaluate", json!([]));
    f.dispatcher.register(extract_rule("page:loaded")).unwrap();

    f.dispatcher
        .dispatch(&BusEvent {
            topic: "page:loaded".into(),
            payload: json!({
                "profile": "p-1",
                "node_ref": "root/body[0]/section[4]",
                "scope_ref": "root/body[0]"
            }),
        })
        .await;

    for _ in 0..100 {
        if !f.bridge.calls_for("evaluate").is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    let args = &f.bridge.calls_for("evaluate")[0]["args"];
    assert_eq!(args[0], json!("root/body[0]"));
    assert_eq!(args[1], json!("root/body[0]/section[4]"));
    assert_eq!(args[2], json!("section.card"));
}

#[tokio::test]
async fn non_matching_topic_is_ignored() {
    let f = fixture();
    f.dispatcher.register(extract_rule("page:loaded")).unwrap();
    f.dispatcher
        .dispatch(&BusEvent { topic: "task:queued".into(), payload: json!({"profile": "p"}) })
        .await;
    assert_eq!(f.queue.pending_len("card"), 0);
    assert!(f.bridge.calls_for("evaluate").is_empty());
}

#[tokio::test]
async fn event_without_profile_is_skipped() {
    let f = fixture();
    f.dispatcher.register(extract_rule("page:loaded")).unwrap();
    f.dispatcher
        .dispatch(&BusEvent { topic: "page:loaded".into(), payload: json!({}) })
        .await;
    assert!(f.bridge.calls_for("evaluate").is_empty());
}

#[tokio::test]
async fn condition_gates_the_trigger() {
    let f = fixture();
    f.bridge.respond("evaluate", json!([]));
    f.dispatcher
        .register(WorkflowRule {
            container: "card".into(),
            triggers: vec![WorkflowTrigger::new(
                "page:loaded",
                vec![TriggerOperation::new("extract")],
            )
            .when(|event| async move {
                event.payload.get("ready").and_then(serde_json::Value::as_bool) == Some(true)
            })],
        })
        .unwrap();

    f.dispatcher
        .dispatch(&BusEvent {
            topic: "page:loaded".into(),
            payload: json!({"profile": "p-1", "ready": false}),
        })
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(f.bridge.calls_for("evaluate").is_empty());

    f.dispatcher
        .dispatch(&BusEvent {
            topic: "page:loaded".into(),
            payload: json!({"profile": "p-1", "ready": true}),
        })
        .await;
    for _ in 0..100 {
        if !f.bridge.calls_for("evaluate").is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(f.bridge.calls_for("evaluate").len(), 1);
}

#[tokio::test]
async fn same_event_twice_enqueues_twice() {
    let f = fixture();
    f.bridge.respond("evaluate", json!([]));
    f.dispatcher.register(extract_rule("page:loaded")).unwrap();

    let event = BusEvent { topic: "page:loaded".into(), payload: json!({"profile": "p-1"}) };
    f.dispatcher.dispatch(&event).await;
    f.dispatcher.dispatch(&event).await;

    for _ in 0..200 {
        if f.bridge.calls_for("evaluate").len() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    // No dedup at the dispatcher: two tasks ran.
    assert_eq!(f.bridge.calls_for("evaluate").len(), 2);
}

#[tokio::test]
async fn installed_middleware_reacts_to_bus_events() {
    let f = fixture();
    f.bridge.respond("evaluate", json!([]));
    f.dispatcher.register(extract_rule("session:created")).unwrap();
    f.dispatcher.install(&f.bus);

    f.bus
        .publish(&drover_core::Event::SessionCreated { profile: "p-1".into() })
        .await;

    for _ in 0..100 {
        if !f.bridge.calls_for("evaluate").is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(f.bridge.calls_for("evaluate").len(), 1);
}
