// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events published on the engine bus.

use crate::checkpoint::Checkpoint;
use crate::error::Fault;
use crate::id::RunId;
use crate::profile::ProfileId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};

/// Events emitted by the core components.
///
/// Serializes with `{"type": "ns:name", ...fields}` format.
/// Unknown type tags deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- task --
    #[serde(rename = "task:queued")]
    TaskQueued {
        task_id: TaskId,
        container_id: String,
        operation: String,
        priority: i32,
    },

    #[serde(rename = "task:started")]
    TaskStarted {
        task_id: TaskId,
        container_id: String,
        operation: String,
    },

    #[serde(rename = "task:completed")]
    TaskCompleted {
        task_id: TaskId,
        container_id: String,
        operation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },

    #[serde(rename = "task:failed")]
    TaskFailed {
        task_id: TaskId,
        container_id: String,
        operation: String,
        error: Fault,
    },

    // -- match --
    #[serde(rename = "match:completed")]
    MatchCompleted {
        profile: ProfileId,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        root: Option<String>,
        matched: Vec<String>,
    },

    // -- checkpoint --
    #[serde(rename = "checkpoint:detected")]
    CheckpointDetected {
        profile: ProfileId,
        checkpoint: Checkpoint,
        url: String,
    },

    #[serde(rename = "checkpoint:enforced")]
    CheckpointEnforced {
        profile: ProfileId,
        target: Checkpoint,
        reached: Checkpoint,
        success: bool,
        attempts: u32,
    },

    // -- workflow --
    #[serde(rename = "workflow:started")]
    WorkflowStarted { run_id: RunId, workflow: String },

    #[serde(rename = "workflow:step_completed")]
    WorkflowStepCompleted {
        run_id: RunId,
        workflow: String,
        step: usize,
        block: String,
    },

    #[serde(rename = "workflow:completed")]
    WorkflowCompleted { run_id: RunId, workflow: String },

    #[serde(rename = "workflow:failed")]
    WorkflowFailed {
        run_id: RunId,
        workflow: String,
        failed_at: usize,
        error: Fault,
    },

    // -- session --
    #[serde(rename = "session:created")]
    SessionCreated { profile: ProfileId },

    #[serde(rename = "session:deleted")]
    SessionDeleted { profile: ProfileId },

    // -- library --
    #[serde(rename = "library:loaded")]
    LibraryLoaded { hash: String, containers: usize },

    /// Catch-all for unknown event types (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// The serialized type tag, used as the bus topic.
    pub fn topic(&self) -> &'static str {
        match self {
            Event::TaskQueued { .. } => "task:queued",
            Event::TaskStarted { .. } => "task:started",
            Event::TaskCompleted { .. } => "task:completed",
            Event::TaskFailed { .. } => "task:failed",
            Event::MatchCompleted { .. } => "match:completed",
            Event::CheckpointDetected { .. } => "checkpoint:detected",
            Event::CheckpointEnforced { .. } => "checkpoint:enforced",
            Event::WorkflowStarted { .. } => "workflow:started",
            Event::WorkflowStepCompleted { .. } => "workflow:step_completed",
            Event::WorkflowCompleted { .. } => "workflow:completed",
            Event::WorkflowFailed { .. } => "workflow:failed",
            Event::SessionCreated { .. } => "session:created",
            Event::SessionDeleted { .. } => "session:deleted",
            Event::LibraryLoaded { .. } => "library:loaded",
            Event::Custom => "custom",
        }
    }

    /// Container id for task lifecycle events, if the event carries one.
    pub fn container_id(&self) -> Option<&str> {
        match self {
            Event::TaskQueued { container_id, .. }
            | Event::TaskStarted { container_id, .. }
            | Event::TaskCompleted { container_id, .. }
            | Event::TaskFailed { container_id, .. } => Some(container_id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
