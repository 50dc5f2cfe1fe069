// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

/// Returns fixed fields.
struct StaticBlock {
    output: HashMap<String, Value>,
}

#[async_trait]
impl Block for StaticBlock {
    async fn execute(&self, _input: Map<String, Value>) -> Outcome {
        Outcome::ok_with(self.output.clone())
    }
}

/// Records the resolved input it was called with.
struct EchoBlock {
    seen: Arc<Mutex<Vec<Map<String, Value>>>>,
}

#[async_trait]
impl Block for EchoBlock {
    async fn execute(&self, input: Map<String, Value>) -> Outcome {
        self.seen.lock().push(input);
        Outcome::ok()
    }
}

/// Always fails.
struct FailBlock;

#[async_trait]
impl Block for FailBlock {
    async fn execute(&self, _input: Map<String, Value>) -> Outcome {
        Outcome::fail(Fault::new(ErrorKind::OperationFailed, "boom"))
    }
}

fn fixture() -> (Arc<BlockRegistry>, Arc<WorkflowRegistry>, Arc<EventBus>, WorkflowExecutor) {
    let blocks = Arc::new(BlockRegistry::new());
    let workflows = Arc::new(WorkflowRegistry::new());
    let bus = Arc::new(EventBus::new());
    let executor = WorkflowExecutor::new(blocks.clone(), workflows.clone(), bus.clone());
    (blocks, workflows, bus, executor)
}

fn two_step(block_a: &str, block_b: &str, input_b: Value) -> WorkflowDefinition {
    WorkflowDefinition {
        id: "wf".into(),
        name: "test workflow".into(),
        steps: vec![
            WorkflowStep { block: block_a.into(), input: Map::new() },
            WorkflowStep {
                block: block_b.into(),
                input: input_b.as_object().cloned().unwrap_or_default(),
            },
        ],
    }
}

fn static_block(output: Value) -> Arc<StaticBlock> {
    Arc::new(StaticBlock {
        output: output
            .as_object()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect(),
    })
}

#[tokio::test]
async fn outputs_propagate_into_later_inputs() {
    let (blocks, _workflows, _bus, executor) = fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));
    blocks.register_block("a", static_block(json!({"sessionId": "s1"})));
    blocks.register_block("b", Arc::new(EchoBlock { seen: seen.clone() }));

    let def = two_step("a", "b", json!({"sid": "$sessionId"}));
    let result = executor.run(&def, Map::new()).await;

    assert!(result.success);
    assert_eq!(seen.lock()[0].get("sid"), Some(&json!("s1")));
    assert_eq!(result.context.get("sessionId"), Some(&json!("s1")));
}

#[tokio::test]
async fn null_outputs_stay_null() {
    let (blocks, _workflows, _bus, executor) = fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));
    blocks.register_block("a", static_block(json!({"sessionId": null})));
    blocks.register_block("b", Arc::new(EchoBlock { seen: seen.clone() }));

    let def = two_step("a", "b", json!({"sid": "$sessionId"}));
    executor.run(&def, Map::new()).await;

    // The key arrives holding null, not dropped.
    let input = &seen.lock()[0];
    assert_eq!(input.get("sid"), Some(&Value::Null));
}

#[tokio::test]
async fn execution_stops_at_first_failure() {
    let (blocks, _workflows, _bus, executor) = fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));
    blocks.register_block("a", static_block(json!({"x": 1})));
    blocks.register_block("fail", Arc::new(FailBlock));
    blocks.register_block("never", Arc::new(EchoBlock { seen: seen.clone() }));

    let def = WorkflowDefinition {
        id: "wf".into(),
        name: "failing".into(),
        steps: vec![
            WorkflowStep { block: "a".into(), input: Map::new() },
            WorkflowStep { block: "fail".into(), input: Map::new() },
            WorkflowStep { block: "never".into(), input: Map::new() },
        ],
    };
    let result = executor.run(&def, Map::new()).await;

    assert!(!result.success);
    assert_eq!(result.failed_at, Some(1));
    assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::OperationFailed);
    // Partial context survives the failure.
    assert_eq!(result.context.get("x"), Some(&json!(1)));
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn unknown_block_fails_that_step() {
    let (_blocks, _workflows, _bus, executor) = fixture();
    let def = WorkflowDefinition {
        id: "wf".into(),
        name: "missing".into(),
        steps: vec![WorkflowStep { block: "ghost".into(), input: Map::new() }],
    };
    let result = executor.run(&def, Map::new()).await;
    assert!(!result.success);
    assert_eq!(result.failed_at, Some(0));
}

#[tokio::test]
async fn later_outputs_overwrite_earlier_keys() {
    let (blocks, _workflows, _bus, executor) = fixture();
    blocks.register_block("a", static_block(json!({"k": "old", "keep": 1})));
    blocks.register_block("b", static_block(json!({"k": "new"})));

    let def = two_step("a", "b", json!({}));
    let result = executor.run(&def, Map::new()).await;

    assert_eq!(result.context.get("k"), Some(&json!("new")));
    assert_eq!(result.context.get("keep"), Some(&json!(1)));
}

#[tokio::test]
async fn initial_context_feeds_first_step() {
    let (blocks, _workflows, _bus, executor) = fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));
    blocks.register_block("echo", Arc::new(EchoBlock { seen: seen.clone() }));

    let def = WorkflowDefinition {
        id: "wf".into(),
        name: "initial".into(),
        steps: vec![WorkflowStep {
            block: "echo".into(),
            input: serde_json::from_value(json!({"kw": "$keyword"})).unwrap(),
        }],
    };
    let mut initial = Map::new();
    initial.insert("keyword".into(), json!("手机壳"));
    executor.run(&def, initial).await;

    assert_eq!(seen.lock()[0].get("kw"), Some(&json!("手机壳")));
}

#[tokio::test]
async fn run_by_id_uses_the_registry() {
    let (blocks, workflows, _bus, executor) = fixture();
    blocks.register_block("a", static_block(json!({"done": true})));
    workflows.register(WorkflowDefinition {
        id: "by-id".into(),
        name: "by id".into(),
        steps: vec![WorkflowStep { block: "a".into(), input: Map::new() }],
    });

    let result = executor.run_workflow_by_id("by-id", Map::new()).await.unwrap();
    assert!(result.success);

    let err = executor.run_workflow_by_id("nope", Map::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::OperationFailed);
}

#[tokio::test]
async fn register_json_parses_definitions() {
    let registry = WorkflowRegistry::new();
    let id = registry
        .register_json(
            r#"{
                "id": "search-notes",
                "name": "Search and collect notes",
                "steps": [
                    {"block": "acquire_permit", "input": {"keyword": "$keyword", "profile": "$profile"}},
                    {"block": "ensure_checkpoint", "input": {"profile": "$profile", "target": "search_ready"}}
                ]
            }"#,
        )
        .unwrap();
    assert_eq!(id, "search-notes");
    assert_eq!(registry.get("search-notes").unwrap().steps.len(), 2);
    assert!(registry.register_json("{not json").is_err());
}

#[tokio::test]
async fn lifecycle_events_published() {
    let (blocks, _workflows, bus, executor) = fixture();
    blocks.register_block("a", static_block(json!({})));

    let topics: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let topics = topics.clone();
        bus.subscribe("workflow:*", move |event| {
            let topics = topics.clone();
            async move {
                topics.lock().push(event.topic);
            }
        });
    }

    let def = WorkflowDefinition {
        id: "wf".into(),
        name: "events".into(),
        steps: vec![WorkflowStep { block: "a".into(), input: Map::new() }],
    };
    executor.run(&def, Map::new()).await;

    assert_eq!(
        *topics.lock(),
        vec!["workflow:started", "workflow:step_completed", "workflow:completed"]
    );
}
