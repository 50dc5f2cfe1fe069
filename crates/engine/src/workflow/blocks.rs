// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in blocks wiring the platform flow
//! (search → list → detail → comments → persist).
//!
//! Blocks own their deadlines (`max_wait_ms`); the core has no universal
//! cancellation token.

use crate::bus::EventBus;
use crate::checkpoint::{report_to_value, CheckpointMachine, EnsureOptions};
use crate::matcher::Matcher;
use crate::queue::{EnqueueOptions, OperationQueue};
use async_trait::async_trait;
use drover_bridge::{ContextProvider, PermitService};
use drover_core::{
    Checkpoint, Clock, ContainerSnapshot, ErrorKind, Event, Fault, OperationTask, Outcome,
    ProfileId, TaskStatus,
};
use drover_library::ContainerLibrary;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::Block;

fn require_str<'a>(input: &'a Map<String, Value>, key: &str) -> Result<&'a str, Fault> {
    input.get(key).and_then(Value::as_str).ok_or_else(|| {
        Fault::new(ErrorKind::OperationFailed, format!("block input missing {key}"))
    })
}

fn profile_of(input: &Map<String, Value>) -> Result<ProfileId, Fault> {
    require_str(input, "profile").map(ProfileId::from)
}

fn fields(entries: Vec<(&str, Value)>) -> HashMap<String, Value> {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Run the matcher and expose the snapshot to later steps.
pub struct MatchPageBlock {
    pub matcher: Arc<Matcher>,
    pub provider: Arc<dyn ContextProvider>,
    pub bus: Arc<EventBus>,
}

#[async_trait]
impl Block for MatchPageBlock {
    async fn execute(&self, input: Map<String, Value>) -> Outcome {
        let profile = match profile_of(&input) {
            Ok(p) => p,
            Err(e) => return Outcome::fail(e),
        };
        let url = match require_str(&input, "url") {
            Ok(u) => u.to_string(),
            Err(e) => return Outcome::fail(e),
        };
        let hint = input.get("root_hint").and_then(Value::as_str);

        let ctx = match self.provider.context_for(&profile).await {
            Ok(ctx) => ctx,
            Err(e) => return Outcome::fail(e),
        };
        let snapshot = match self.matcher.snapshot(&ctx, &url, hint).await {
            Ok(s) => s,
            Err(e) => return Outcome::fail(Fault::new(e.kind(), e.to_string())),
        };

        self.bus
            .publish(&Event::MatchCompleted {
                profile,
                url: url.clone(),
                root: snapshot.root_container_id().map(str::to_string),
                matched: snapshot.matched_ids.clone(),
            })
            .await;

        let root = snapshot
            .root_container_id()
            .map_or(Value::Null, |id| Value::String(id.to_string()));
        let matched = serde_json::to_value(&snapshot.matched_ids).unwrap_or(Value::Null);
        let snapshot_value = serde_json::to_value(&snapshot).unwrap_or(Value::Null);
        Outcome::ok_with(fields(vec![
            ("snapshot", snapshot_value),
            ("root", root),
            ("matched_ids", matched),
        ]))
    }
}

/// Detect-and-enforce a checkpoint before the flow continues.
pub struct EnsureCheckpointBlock {
    pub machine: Arc<CheckpointMachine>,
    pub provider: Arc<dyn ContextProvider>,
    pub bus: Arc<EventBus>,
}

#[async_trait]
impl Block for EnsureCheckpointBlock {
    async fn execute(&self, input: Map<String, Value>) -> Outcome {
        let profile = match profile_of(&input) {
            Ok(p) => p,
            Err(e) => return Outcome::fail(e),
        };
        let target = match require_str(&input, "target").map(Checkpoint::parse) {
            Ok(Some(target)) => target,
            Ok(None) => {
                return Outcome::fail(Fault::new(
                    ErrorKind::OperationFailed,
                    "unknown checkpoint target",
                ))
            }
            Err(e) => return Outcome::fail(e),
        };

        let mut opts = EnsureOptions::default();
        if let Some(ms) = input.get("timeout_ms").and_then(Value::as_u64) {
            opts.timeout_ms = ms;
        }
        if let Some(ms) = input.get("check_interval_ms").and_then(Value::as_u64) {
            opts.check_interval_ms = ms;
        }
        if let Some(allow) = input
            .get("allow_one_level_up_fallback")
            .and_then(Value::as_bool)
        {
            opts.allow_one_level_up_fallback = allow;
        }

        let ctx = match self.provider.context_for(&profile).await {
            Ok(ctx) => ctx,
            Err(e) => return Outcome::fail(e),
        };
        let report = self.machine.ensure(&ctx, target, opts).await;

        self.bus
            .publish(&Event::CheckpointEnforced {
                profile,
                target,
                reached: report.reached,
                success: report.success,
                attempts: report.attempts.len() as u32,
            })
            .await;

        let out = fields(vec![
            ("checkpoint", Value::String(report.reached.to_string())),
            ("checkpoint_report", report_to_value(&report)),
        ]);
        match report.fault() {
            None => Outcome::ok_with(out),
            Some(fault) => Outcome::fail_with(fault, out),
        }
    }
}

/// The live node targeting resolved by the matcher for one container.
struct ResolvedTarget {
    node_ref: Option<String>,
    scope_ref: Option<String>,
    selector: Option<String>,
    singular: bool,
}

/// Pull the instance bound to `container_id` out of a snapshot, with its
/// own node path, its parent's subtree path, and the selector that won.
fn resolved_target(snapshot: &ContainerSnapshot, container_id: &str) -> Option<ResolvedTarget> {
    let instance = snapshot.instance_for(container_id)?;
    let scope_ref = instance.parent_instance_id.and_then(|parent_id| {
        snapshot
            .instances
            .iter()
            .find(|i| i.id == parent_id)
            .and_then(|parent| parent.node_ref.clone())
    });
    Some(ResolvedTarget {
        node_ref: instance.node_ref.clone(),
        scope_ref,
        selector: instance.selector.clone(),
        singular: instance.match_count <= 1,
    })
}

/// Shared enqueue-and-wait path for operation blocks.
async fn run_on_queue<C: Clock + 'static>(
    queue: &OperationQueue<C>,
    library: &ContainerLibrary,
    input: &Map<String, Value>,
    operation: &str,
    extra_config: Map<String, Value>,
) -> Result<OperationTask, Fault> {
    let profile = profile_of(input)?;
    let container_id = require_str(input, "container")?;
    let def = library.get(container_id).ok_or_else(|| {
        Fault::new(ErrorKind::OperationFailed, format!("unknown container: {container_id}"))
    })?;

    // Container-declared defaults first, then block-level extras, then
    // caller config: the caller always wins.
    let mut config = def.default_config_for(operation).cloned().unwrap_or_default();
    for (key, value) in extra_config {
        config.insert(key, value);
    }
    if let Some(caller) = input.get("config").and_then(Value::as_object) {
        for (key, value) in caller {
            config.insert(key.clone(), value.clone());
        }
    }
    // Target the live node the matcher resolved when the caller hands the
    // step a snapshot; the static selector is only the last resort.
    let snapshot = input
        .get("snapshot")
        .and_then(|v| serde_json::from_value::<ContainerSnapshot>(v.clone()).ok());
    if let Some(target) = snapshot.as_ref().and_then(|s| resolved_target(s, container_id)) {
        if !config.contains_key("node_ref") {
            if let Some(node_ref) = target.node_ref {
                config.insert("node_ref".into(), Value::String(node_ref));
            }
        }
        if !config.contains_key("scope_ref") {
            if let Some(scope_ref) = target.scope_ref {
                config.insert("scope_ref".into(), Value::String(scope_ref));
            }
        }
        if !config.contains_key("selector") {
            if let Some(selector) = target.selector {
                config.insert("selector".into(), Value::String(selector));
            }
        }
        config
            .entry("singular".to_string())
            .or_insert(Value::Bool(target.singular));
    }
    if !config.contains_key("selector") {
        if let Some(selector) = def.selectors.first() {
            config.insert("selector".into(), Value::String(selector.css.clone()));
        }
    }

    let priority = input
        .get("priority")
        .and_then(Value::as_i64)
        .unwrap_or(0) as i32;
    let max_wait_ms = input
        .get("max_wait_ms")
        .and_then(Value::as_u64)
        .unwrap_or(30_000);

    let ticket = queue
        .enqueue(&def, &profile, operation, EnqueueOptions { priority, config, event: None })
        .await
        .map_err(|e| Fault::new(e.kind(), e.to_string()))?;

    let task = tokio::time::timeout(Duration::from_millis(max_wait_ms), ticket.wait())
        .await
        .map_err(|_| {
            Fault::new(
                ErrorKind::OperationFailed,
                format!("timed out after {max_wait_ms}ms waiting for {operation}"),
            )
        })?
        .ok_or_else(|| Fault::new(ErrorKind::OperationFailed, "task was cancelled"))?;

    Ok(task)
}

fn task_outcome(task: OperationTask) -> Outcome {
    let out = fields(vec![
        ("task_id", Value::String(task.id.to_string())),
        ("result", task.result.clone().unwrap_or(Value::Null)),
    ]);
    match task.status {
        TaskStatus::Failed => {
            let fault = task
                .error
                .unwrap_or_else(|| Fault::new(ErrorKind::OperationFailed, "task failed"));
            Outcome::fail_with(fault, out)
        }
        _ => Outcome::ok_with(out),
    }
}

/// Enqueue one operation on a container and wait for its result.
///
/// Pass the match step's `snapshot` in the input so the operation runs
/// against the resolved instance node instead of a global CSS query.
pub struct RunOperationBlock<C: Clock + 'static> {
    pub queue: OperationQueue<C>,
    pub library: Arc<ContainerLibrary>,
}

#[async_trait]
impl<C: Clock + 'static> Block for RunOperationBlock<C> {
    async fn execute(&self, input: Map<String, Value>) -> Outcome {
        let operation = match require_str(&input, "operation") {
            Ok(op) => op.to_string(),
            Err(e) => return Outcome::fail(e),
        };
        match run_on_queue(&self.queue, &self.library, &input, &operation, Map::new()).await {
            Ok(task) => task_outcome(task),
            Err(e) => Outcome::fail(e),
        }
    }
}

/// Extract records from a list container; exposes them as `items`.
pub struct ExtractListBlock<C: Clock + 'static> {
    pub queue: OperationQueue<C>,
    pub library: Arc<ContainerLibrary>,
}

#[async_trait]
impl<C: Clock + 'static> Block for ExtractListBlock<C> {
    async fn execute(&self, input: Map<String, Value>) -> Outcome {
        let mut extra = Map::new();
        if let Some(field_map) = input.get("fields") {
            extra.insert("fields".into(), field_map.clone());
        }
        if let Some(include_text) = input.get("include_text") {
            extra.insert("include_text".into(), include_text.clone());
        }
        match run_on_queue(&self.queue, &self.library, &input, "extract", extra).await {
            Ok(task) => {
                let items = task.result.clone().unwrap_or(Value::Array(Vec::new()));
                let count = items.as_array().map_or(0, Vec::len);
                match task.status {
                    TaskStatus::Failed => task_outcome(task),
                    _ => Outcome::ok_with(fields(vec![
                        ("items", items),
                        ("item_count", Value::from(count)),
                    ])),
                }
            }
            Err(e) => Outcome::fail(e),
        }
    }
}

/// Serialize collected items as JSONL under the download sink.
pub struct PersistJsonlBlock {
    pub download_root: Option<PathBuf>,
}

impl PersistJsonlBlock {
    fn sink_dir(&self, site: &str) -> Result<PathBuf, Fault> {
        let base = match &self.download_root {
            Some(root) => root.clone(),
            None => dirs::home_dir()
                .ok_or_else(|| {
                    Fault::new(ErrorKind::OperationFailed, "no home directory for download sink")
                })?
                .join(".drover")
                .join("download"),
        };
        Ok(base.join(site))
    }
}

#[async_trait]
impl Block for PersistJsonlBlock {
    async fn execute(&self, input: Map<String, Value>) -> Outcome {
        let site = match require_str(&input, "site") {
            Ok(s) => s.to_string(),
            Err(e) => return Outcome::fail(e),
        };
        let name = match require_str(&input, "name") {
            Ok(n) => n.to_string(),
            Err(e) => return Outcome::fail(e),
        };
        let Some(items) = input.get("items").and_then(Value::as_array).cloned() else {
            return Outcome::fail(Fault::new(
                ErrorKind::OperationFailed,
                "persist_jsonl requires items",
            ));
        };

        let dir = match self.sink_dir(&site) {
            Ok(dir) => dir,
            Err(e) => return Outcome::fail(e),
        };
        let path = dir.join(format!("{name}.jsonl"));
        let write = || -> std::io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            for item in &items {
                writeln!(file, "{item}")?;
            }
            Ok(())
        };
        if let Err(e) = write() {
            return Outcome::fail(Fault::new(
                ErrorKind::OperationFailed,
                format!("persist failed: {e}"),
            ));
        }

        tracing::info!(path = %path.display(), count = items.len(), "persisted items");
        Outcome::ok_with(fields(vec![
            ("path", Value::String(path.display().to_string())),
            ("count", Value::from(items.len())),
        ]))
    }
}

/// Obtain a rate-limit permit before a platform search.
pub struct AcquirePermitBlock {
    pub permits: Arc<dyn PermitService>,
}

#[async_trait]
impl Block for AcquirePermitBlock {
    async fn execute(&self, input: Map<String, Value>) -> Outcome {
        let keyword = match require_str(&input, "keyword") {
            Ok(k) => k.to_string(),
            Err(e) => return Outcome::fail(e),
        };
        let profile = match profile_of(&input) {
            Ok(p) => p,
            Err(e) => return Outcome::fail(e),
        };
        match self.permits.acquire(&keyword, &profile).await {
            Ok(permit) => Outcome::ok_with(fields(vec![
                ("permit", serde_json::to_value(&permit).unwrap_or(Value::Null)),
                ("keyword", Value::String(keyword)),
            ])),
            Err(e) => Outcome::fail(e),
        }
    }
}

/// Drive the page to a URL.
pub struct NavigateBlock {
    pub provider: Arc<dyn ContextProvider>,
}

#[async_trait]
impl Block for NavigateBlock {
    async fn execute(&self, input: Map<String, Value>) -> Outcome {
        let profile = match profile_of(&input) {
            Ok(p) => p,
            Err(e) => return Outcome::fail(e),
        };
        let url = match require_str(&input, "url") {
            Ok(u) => u.to_string(),
            Err(e) => return Outcome::fail(e),
        };
        let ctx = match self.provider.context_for(&profile).await {
            Ok(ctx) => ctx,
            Err(e) => return Outcome::fail(e),
        };
        if let Err(e) = ctx.page().goto(&url).await {
            return Outcome::fail(e.into_fault());
        }
        Outcome::ok_with(fields(vec![("url", Value::String(url))]))
    }
}

/// Sleep between steps. Pacing lives in workflows, not the queue.
pub struct WaitBlock;

#[async_trait]
impl Block for WaitBlock {
    async fn execute(&self, input: Map<String, Value>) -> Outcome {
        let ms = input.get("ms").and_then(Value::as_u64).unwrap_or(500);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Outcome::ok_with(fields(vec![("waited_ms", Value::from(ms))]))
    }
}

#[cfg(test)]
#[path = "blocks_tests.rs"]
mod tests;
