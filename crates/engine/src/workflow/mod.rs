// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Block-based workflow executor.
//!
//! Steps run strictly sequentially; each block's returned fields are
//! shallow-merged into the shared context, and `$var` references in later
//! inputs resolve against that context. The executor stops on the first
//! failure and returns the partial context; retries belong to blocks.

pub mod blocks;
mod vars;

pub use vars::{lookup, resolve, resolve_input};

use crate::bus::EventBus;
use async_trait::async_trait;
use drover_core::{ErrorKind, Event, Fault, Outcome, RunId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One workflow step: a block name plus its (unresolved) input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub block: String,
    #[serde(default)]
    pub input: Map<String, Value>,
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

/// An asynchronous workflow step unit.
#[async_trait]
pub trait Block: Send + Sync {
    async fn execute(&self, input: Map<String, Value>) -> Outcome;
}

/// Process-local block registry. Constructor variant; the engine owns one.
#[derive(Default)]
pub struct BlockRegistry {
    blocks: Mutex<HashMap<String, Arc<dyn Block>>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_block(&self, name: &str, block: Arc<dyn Block>) {
        self.blocks.lock().insert(name.to_string(), block);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Block>> {
        self.blocks.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blocks.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Named workflow definitions.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: Mutex<HashMap<String, WorkflowDefinition>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, def: WorkflowDefinition) {
        self.workflows.lock().insert(def.id.clone(), def);
    }

    /// Parse and register a JSON definition.
    pub fn register_json(&self, body: &str) -> Result<String, Fault> {
        let def: WorkflowDefinition = serde_json::from_str(body)
            .map_err(|e| Fault::new(ErrorKind::OperationFailed, format!("bad workflow: {e}")))?;
        let id = def.id.clone();
        self.register(def);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<WorkflowDefinition> {
        self.workflows.lock().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workflows.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Result of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRunResult {
    pub run_id: RunId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Fault>,
    pub context: Map<String, Value>,
}

/// Runs workflows: resolves inputs, merges outputs, stops on failure.
pub struct WorkflowExecutor {
    blocks: Arc<BlockRegistry>,
    workflows: Arc<WorkflowRegistry>,
    bus: Arc<EventBus>,
}

impl WorkflowExecutor {
    pub fn new(
        blocks: Arc<BlockRegistry>,
        workflows: Arc<WorkflowRegistry>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self { blocks, workflows, bus }
    }

    pub async fn run_workflow_by_id(
        &self,
        id: &str,
        initial: Map<String, Value>,
    ) -> Result<WorkflowRunResult, Fault> {
        let def = self.workflows.get(id).ok_or_else(|| {
            Fault::new(ErrorKind::OperationFailed, format!("unknown workflow: {id}"))
        })?;
        Ok(self.run(&def, initial).await)
    }

    pub async fn run(
        &self,
        def: &WorkflowDefinition,
        initial: Map<String, Value>,
    ) -> WorkflowRunResult {
        let run_id = RunId::new();
        let mut context = initial;

        self.bus
            .publish(&Event::WorkflowStarted { run_id, workflow: def.id.clone() })
            .await;
        tracing::info!(workflow = %def.id, run = %run_id, steps = def.steps.len(), "workflow started");

        for (index, step) in def.steps.iter().enumerate() {
            let input = vars::resolve_input(&step.input, &context);

            let Some(block) = self.blocks.get(&step.block) else {
                let error = Fault::new(
                    ErrorKind::OperationFailed,
                    format!("unknown block: {}", step.block),
                );
                return self.fail(def, run_id, index, error, context).await;
            };

            let outcome = block.execute(input).await;
            // Outputs merge even on failure so the caller sees partial state.
            for (key, value) in outcome.fields {
                context.insert(key, value);
            }

            if !outcome.success {
                let error = outcome.error.unwrap_or_else(|| {
                    Fault::new(ErrorKind::OperationFailed, format!("block {} failed", step.block))
                });
                return self.fail(def, run_id, index, error, context).await;
            }

            self.bus
                .publish(&Event::WorkflowStepCompleted {
                    run_id,
                    workflow: def.id.clone(),
                    step: index,
                    block: step.block.clone(),
                })
                .await;
        }

        self.bus
            .publish(&Event::WorkflowCompleted { run_id, workflow: def.id.clone() })
            .await;
        WorkflowRunResult { run_id, success: true, failed_at: None, error: None, context }
    }

    async fn fail(
        &self,
        def: &WorkflowDefinition,
        run_id: RunId,
        index: usize,
        error: Fault,
        context: Map<String, Value>,
    ) -> WorkflowRunResult {
        tracing::warn!(workflow = %def.id, run = %run_id, step = index, %error, "workflow failed");
        self.bus
            .publish(&Event::WorkflowFailed {
                run_id,
                workflow: def.id.clone(),
                failed_at: index,
                error: error.clone(),
            })
            .await;
        WorkflowRunResult {
            run_id,
            success: false,
            failed_at: Some(index),
            error: Some(error),
            context,
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
