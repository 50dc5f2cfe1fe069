// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-engine: matching, operations, queueing, checkpoints, workflows.
//!
//! The execution path is queue-first: every operation reaches the browser
//! through [`OperationQueue::enqueue`]; there is no bypass.

pub mod binding;
pub mod bus;
pub mod checkpoint;
pub mod dispatcher;
pub mod matcher;
pub mod ops;
pub mod queue;
pub mod runtime;
pub mod workflow;

pub use binding::{BindingError, BindingIssue, IssueSeverity};
pub use bus::{BusEvent, EventBus};
pub use checkpoint::{Attempt, CheckpointMachine, CheckpointRules, EnsureOptions, EnsureReport};
pub use dispatcher::{Dispatcher, TriggerOperation, WorkflowRule, WorkflowTrigger};
pub use matcher::{MatchError, Matcher};
pub use ops::{Operation, OperationRegistry};
pub use queue::{EnqueueOptions, OperationQueue, TaskTicket};
pub use runtime::{Engine, EngineBuilder};
pub use workflow::{
    resolve, Block, BlockRegistry, WorkflowDefinition, WorkflowExecutor, WorkflowRegistry,
    WorkflowRunResult, WorkflowStep,
};
