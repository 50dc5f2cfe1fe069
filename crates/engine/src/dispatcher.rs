// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event → operation dispatcher.
//!
//! A workflow-rule table maps bus events onto queued operations. Rules are
//! validated against the binding gate at registration time; dispatch never
//! re-validates and never dedups (the same event twice enqueues twice).

use crate::binding::{self, BindingError};
use crate::bus::{topic_matches, BusEvent, EventBus};
use crate::queue::{EnqueueOptions, OperationQueue};
use crate::ops::OperationRegistry;
use drover_core::{Clock, ProfileId};
use drover_library::ContainerLibrary;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type ConditionFuture = Pin<Box<dyn Future<Output = bool> + Send>>;
type Condition = Arc<dyn Fn(BusEvent) -> ConditionFuture + Send + Sync>;

/// One operation a trigger enqueues.
#[derive(Debug, Clone)]
pub struct TriggerOperation {
    pub id: String,
    pub priority: i32,
    pub config: Option<Map<String, Value>>,
}

impl TriggerOperation {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), priority: 0, config: None }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = Some(config);
        self
    }
}

/// An event pattern plus the operations it triggers.
pub struct WorkflowTrigger {
    pub event: String,
    condition: Option<Condition>,
    pub operations: Vec<TriggerOperation>,
}

impl WorkflowTrigger {
    pub fn new(event: impl Into<String>, operations: Vec<TriggerOperation>) -> Self {
        Self { event: event.into(), condition: None, operations }
    }

    /// Attach an awaitable predicate; the trigger fires only when it
    /// returns true.
    pub fn when<F, Fut>(mut self, condition: F) -> Self
    where
        F: Fn(BusEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.condition = Some(Arc::new(move |event| Box::pin(condition(event))));
        self
    }
}

/// A container plus its triggers.
pub struct WorkflowRule {
    pub container: String,
    pub triggers: Vec<WorkflowTrigger>,
}

/// Routes matching bus events into the operation queue.
pub struct Dispatcher<C: Clock + 'static> {
    queue: OperationQueue<C>,
    library: Arc<ContainerLibrary>,
    registry: Arc<OperationRegistry>,
    rules: Mutex<Vec<Arc<WorkflowRule>>>,
}

impl<C: Clock + 'static> Dispatcher<C> {
    pub fn new(
        queue: OperationQueue<C>,
        library: Arc<ContainerLibrary>,
        registry: Arc<OperationRegistry>,
    ) -> Self {
        Self { queue, library, registry, rules: Mutex::new(Vec::new()) }
    }

    /// Validate and store a rule. Every operation id must pass the
    /// binding gate for the rule's container; invalid rules are
    /// rejected here, not at dispatch.
    pub fn register(&self, rule: WorkflowRule) -> Result<(), BindingError> {
        let def = self
            .library
            .get(&rule.container)
            .ok_or_else(|| BindingError::UnknownOperation(format!(
                "unknown container in rule: {}",
                rule.container
            )))?;
        for trigger in &rule.triggers {
            for op in &trigger.operations {
                binding::container_allows_operation(&def, &op.id, &self.registry)?;
            }
        }
        self.rules.lock().push(Arc::new(rule));
        Ok(())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.lock().len()
    }

    /// Feed one event through the rule table. Enqueue order mirrors
    /// declaration order; profiles and node targets come from the event
    /// payload.
    pub async fn dispatch(&self, event: &BusEvent) {
        let rules: Vec<Arc<WorkflowRule>> = self.rules.lock().clone();
        for rule in rules {
            for trigger in &rule.triggers {
                if !topic_matches(&trigger.event, &event.topic) {
                    continue;
                }
                if let Some(condition) = &trigger.condition {
                    if !condition(event.clone()).await {
                        continue;
                    }
                }
                self.fire(&rule, trigger, event).await;
            }
        }
    }

    async fn fire(&self, rule: &WorkflowRule, trigger: &WorkflowTrigger, event: &BusEvent) {
        let Some(profile) = event
            .payload
            .get("profile")
            .and_then(Value::as_str)
            .map(ProfileId::from)
        else {
            tracing::warn!(
                topic = %event.topic,
                container = %rule.container,
                "trigger fired on event without a profile; skipped"
            );
            return;
        };
        let Some(def) = self.library.get(&rule.container) else {
            tracing::warn!(container = %rule.container, "rule container vanished from library");
            return;
        };

        for op in &trigger.operations {
            // Defaults under trigger config; trigger config wins.
            let mut config = def.default_config_for(&op.id).cloned().unwrap_or_default();
            if let Some(overrides) = &op.config {
                for (key, value) in overrides {
                    config.insert(key.clone(), value.clone());
                }
            }
            // Node targeting rides on the event: emitters that matched a
            // live instance put its paths in the payload.
            for key in ["node_ref", "scope_ref"] {
                if !config.contains_key(key) {
                    if let Some(value) = event.payload.get(key).and_then(Value::as_str) {
                        config.insert(key.to_string(), Value::String(value.to_string()));
                    }
                }
            }
            if !config.contains_key("selector") {
                if let Some(selector) = def.selectors.first() {
                    config.insert("selector".into(), Value::String(selector.css.clone()));
                }
            }

            let result = self
                .queue
                .enqueue(
                    &def,
                    &profile,
                    &op.id,
                    EnqueueOptions {
                        priority: op.priority,
                        config,
                        event: Some(event.topic.clone()),
                    },
                )
                .await;
            if let Err(e) = result {
                // Unreachable for registered rules; containers may have
                // been refreshed out from under us.
                tracing::warn!(container = %rule.container, op = %op.id, %e, "dispatch enqueue rejected");
            }
        }
    }

    /// Install this dispatcher as bus middleware.
    pub fn install(self: &Arc<Self>, bus: &EventBus) {
        let dispatcher = self.clone();
        bus.add_middleware(move |event| {
            let dispatcher = dispatcher.clone();
            async move {
                dispatcher.dispatch(&event).await;
            }
        });
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
