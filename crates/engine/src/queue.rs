// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-container operation queue.
//!
//! One cooperative worker per container id: tasks drain in priority-desc
//! order, FIFO within a priority. The `processing` set guarantees single
//! flight per container; workers terminate on drain and a fresh one spawns
//! on the next enqueue. Containers are independent; workers for different
//! containers interleave freely at await points.

use crate::binding::{self, BindingError};
use crate::bus::EventBus;
use crate::ops::OperationRegistry;
use drover_bridge::ContextProvider;
use drover_core::{
    Clock, ContainerDefinition, ErrorKind, Event, Fault, OperationTask, ProfileId, TaskId,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Caller-facing enqueue knobs. The queue does not merge container
/// defaults; that belongs to the caller (executor/dispatcher), whose
/// config wins over container-declared defaults.
#[derive(Default)]
pub struct EnqueueOptions {
    pub priority: i32,
    pub config: Map<String, Value>,
    /// Bus topic that triggered this enqueue, for traceability
    pub event: Option<String>,
}

/// Handle to a queued task.
#[derive(Debug)]
pub struct TaskTicket {
    task: OperationTask,
    done: oneshot::Receiver<OperationTask>,
}

impl TaskTicket {
    pub fn id(&self) -> TaskId {
        self.task.id
    }

    /// The task as it looked at enqueue time.
    pub fn queued(&self) -> &OperationTask {
        &self.task
    }

    /// Wait for the terminal task record. `None` when the task was
    /// cancelled before it started.
    pub async fn wait(self) -> Option<OperationTask> {
        self.done.await.ok()
    }
}

struct QueuedTask {
    task: OperationTask,
    profile: ProfileId,
    seq: u64,
    done: oneshot::Sender<OperationTask>,
}

struct QueueInner<C: Clock> {
    registry: Arc<OperationRegistry>,
    bus: Arc<EventBus>,
    clock: C,
    provider: Mutex<Option<Arc<dyn ContextProvider>>>,
    pending: Mutex<HashMap<String, Vec<QueuedTask>>>,
    processing: Mutex<HashSet<String>>,
    seq: AtomicU64,
}

/// The per-container priority queue.
pub struct OperationQueue<C: Clock + 'static> {
    inner: Arc<QueueInner<C>>,
}

impl<C: Clock + 'static> Clone for OperationQueue<C> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<C: Clock + 'static> OperationQueue<C> {
    pub fn new(registry: Arc<OperationRegistry>, bus: Arc<EventBus>, clock: C) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                registry,
                bus,
                clock,
                provider: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                processing: Mutex::new(HashSet::new()),
                seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn set_context_provider(&self, provider: Arc<dyn ContextProvider>) {
        *self.inner.provider.lock() = Some(provider);
    }

    /// Queue an operation on a container. Binding is enforced here; a
    /// task that clears this gate will run (or fail) on the worker.
    pub async fn enqueue(
        &self,
        container: &ContainerDefinition,
        profile: &ProfileId,
        operation: &str,
        opts: EnqueueOptions,
    ) -> Result<TaskTicket, BindingError> {
        binding::container_allows_operation(container, operation, &self.inner.registry)?;

        let mut task = OperationTask::new(
            container.id.clone(),
            operation,
            opts.priority,
            opts.config,
            &self.inner.clock,
        );
        task.event = opts.event;

        let (done_tx, done_rx) = oneshot::channel();
        let ticket = TaskTicket { task: task.clone(), done: done_rx };
        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst);

        // Publish before inserting: a live worker may pop the task the
        // instant it lands, and `queued` must precede `started`.
        self.inner
            .bus
            .publish(&Event::TaskQueued {
                task_id: ticket.task.id,
                container_id: container.id.clone(),
                operation: operation.to_string(),
                priority: opts.priority,
            })
            .await;

        self.inner
            .pending
            .lock()
            .entry(container.id.clone())
            .or_default()
            .push(QueuedTask { task, profile: profile.clone(), seq, done: done_tx });

        let should_spawn = {
            let mut processing = self.inner.processing.lock();
            processing.insert(container.id.clone())
        };
        if should_spawn {
            let inner = self.inner.clone();
            let container_id = container.id.clone();
            tokio::spawn(async move {
                run_worker(inner, container_id).await;
            });
        }

        Ok(ticket)
    }

    /// Cancel a task. Only possible while it is still pending; a running
    /// task is atomic from the queue's viewpoint.
    pub fn cancel(&self, container_id: &str, task_id: TaskId) -> bool {
        let mut pending = self.inner.pending.lock();
        let Some(queue) = pending.get_mut(container_id) else {
            return false;
        };
        let before = queue.len();
        queue.retain(|queued| queued.task.id != task_id);
        before != queue.len()
    }

    /// Pending task count for a container (running task excluded).
    pub fn pending_len(&self, container_id: &str) -> usize {
        self.inner
            .pending
            .lock()
            .get(container_id)
            .map_or(0, Vec::len)
    }
}

/// Pop the best task: highest priority, then lowest seq (FIFO).
fn pop_best(queue: &mut Vec<QueuedTask>) -> Option<QueuedTask> {
    let best = queue
        .iter()
        .enumerate()
        .max_by_key(|(_, q)| (q.task.priority, std::cmp::Reverse(q.seq)))
        .map(|(i, _)| i)?;
    Some(queue.remove(best))
}

async fn run_worker<C: Clock>(inner: Arc<QueueInner<C>>, container_id: String) {
    loop {
        let next = {
            let mut pending = inner.pending.lock();
            let popped = pending.get_mut(&container_id).and_then(pop_best);
            if popped.is_none() {
                // Drained: drop the queue entry and the single-flight
                // marker inside the same pending lock so a concurrent
                // enqueue either sees the marker or spawns a worker.
                pending.remove(&container_id);
                inner.processing.lock().remove(&container_id);
            }
            popped
        };
        let Some(queued) = next else {
            break;
        };
        run_task(&inner, queued).await;
    }
}

async fn run_task<C: Clock>(inner: &QueueInner<C>, queued: QueuedTask) {
    let QueuedTask { mut task, profile, done, .. } = queued;

    // Keep event timestamps strictly monotonic even on coarse clocks.
    let started_at = inner.clock.epoch_ms().max(task.enqueued_at_ms + 1);
    task.start(started_at);
    inner
        .bus
        .publish(&Event::TaskStarted {
            task_id: task.id,
            container_id: task.container_id.clone(),
            operation: task.operation.clone(),
        })
        .await;

    let start = std::time::Instant::now();
    let provider = inner.provider.lock().clone();
    let result = match provider {
        None => Err(Fault::new(
            ErrorKind::NoContextProvider,
            "operation queue has no context provider",
        )),
        Some(provider) => match provider.context_for(&profile).await {
            Err(fault) => Err(fault),
            Ok(ctx) => match inner.registry.get(&task.operation) {
                // Unreachable post-binding, but never panic on it.
                None => Err(Fault::new(
                    ErrorKind::OperationNotDeclared,
                    format!("operation vanished from registry: {}", task.operation),
                )),
                Some(op) => op.run(&ctx, &task.config).await,
            },
        },
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let finished_at = inner.clock.epoch_ms().max(started_at + 1);
    match result {
        Ok(value) => {
            tracing::info!(
                task = %task.id,
                container = %task.container_id,
                op = %task.operation,
                elapsed_ms,
                "task completed"
            );
            task.complete(value.clone(), finished_at);
            inner
                .bus
                .publish(&Event::TaskCompleted {
                    task_id: task.id,
                    container_id: task.container_id.clone(),
                    operation: task.operation.clone(),
                    result: Some(value),
                })
                .await;
        }
        Err(fault) => {
            tracing::warn!(
                task = %task.id,
                container = %task.container_id,
                op = %task.operation,
                error = %fault,
                elapsed_ms,
                "task failed"
            );
            task.fail(fault.clone(), finished_at);
            inner
                .bus
                .publish(&Event::TaskFailed {
                    task_id: task.id,
                    container_id: task.container_id.clone(),
                    operation: task.operation.clone(),
                    error: fault,
                })
                .await;
        }
    }

    let _ = done.send(task);
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
