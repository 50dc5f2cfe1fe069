// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation task record and status machine.

use crate::clock::Clock;
use crate::error::Fault;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a queued operation task.
    ///
    /// Minted at enqueue; follows the task through its lifecycle events
    /// and into the progress log.
    pub struct TaskId("tsk-");
}

/// Status of a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in its container's queue
    Pending,
    /// Running on the container's single-flight worker
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Tag-only mirror of [`TaskStatus`] for protocol DTOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatusKind {
    Pending,
    Running,
    Completed,
    Failed,
}

impl From<&TaskStatus> for TaskStatusKind {
    fn from(s: &TaskStatus) -> Self {
        match s {
            TaskStatus::Pending => TaskStatusKind::Pending,
            TaskStatus::Running => TaskStatusKind::Running,
            TaskStatus::Completed => TaskStatusKind::Completed,
            TaskStatus::Failed => TaskStatusKind::Failed,
        }
    }
}

/// A queued unit of work: one operation on one container.
///
/// Exclusively owned by its queue until terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationTask {
    pub id: TaskId,
    pub container_id: String,
    pub operation: String,
    /// Higher runs first; FIFO within equal priority
    pub priority: i32,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub config: serde_json::Map<String, serde_json::Value>,
    pub status: TaskStatus,
    pub enqueued_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Fault>,
    /// Bus topic that triggered the enqueue, when dispatched from a rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl OperationTask {
    pub fn new(
        container_id: impl Into<String>,
        operation: impl Into<String>,
        priority: i32,
        config: serde_json::Map<String, serde_json::Value>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: TaskId::new(),
            container_id: container_id.into(),
            operation: operation.into(),
            priority,
            config,
            status: TaskStatus::Pending,
            enqueued_at_ms: clock.epoch_ms(),
            started_at_ms: None,
            finished_at_ms: None,
            result: None,
            error: None,
            event: None,
        }
    }

    /// Transition to running. Records the start timestamp.
    pub fn start(&mut self, epoch_ms: u64) {
        self.status = TaskStatus::Running;
        self.started_at_ms = Some(epoch_ms);
    }

    /// Transition to completed with the operation's result value.
    pub fn complete(&mut self, result: serde_json::Value, epoch_ms: u64) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.finished_at_ms = Some(epoch_ms);
    }

    /// Transition to failed with a typed fault.
    pub fn fail(&mut self, error: Fault, epoch_ms: u64) {
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.finished_at_ms = Some(epoch_ms);
    }
}

crate::builder! {
    pub struct OperationTaskBuilder => OperationTask {
        into {
            container_id: String = "site_home",
            operation: String = "highlight",
        }
        set {
            priority: i32 = 0,
            config: serde_json::Map<String, serde_json::Value> = serde_json::Map::new(),
            status: TaskStatus = TaskStatus::Pending,
            enqueued_at_ms: u64 = 1_000_000,
        }
        option {
            started_at_ms: u64 = None,
            finished_at_ms: u64 = None,
            result: serde_json::Value = None,
            error: Fault = None,
            event: String = None,
        }
        computed {
            id: TaskId = TaskId::new(),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
