// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container/operation binding: the gate in front of the queue.
//!
//! Two rules, checked before a task may be enqueued:
//! 1. the container's capabilities cover the operation's requirements;
//! 2. when the container declares an operations list, the operation id is
//!    on it.
//!
//! Violations are programmer errors and surface as typed `Err` values at
//! registration/enqueue time, never as runtime faults.

use crate::ops::OperationRegistry;
use drover_core::{ContainerDefinition, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("container {container} lacks capability {capability} required by {operation}")]
    CapabilityMissing {
        container: String,
        operation: String,
        capability: String,
    },

    #[error("container {container} does not declare operation {operation}")]
    OperationNotDeclared {
        container: String,
        operation: String,
    },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

impl BindingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BindingError::CapabilityMissing { .. } => ErrorKind::CapabilityMissing,
            BindingError::OperationNotDeclared { .. } => ErrorKind::OperationNotDeclared,
            BindingError::UnknownOperation(_) => ErrorKind::OperationNotDeclared,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// One finding from definition validation.
#[derive(Debug, Clone)]
pub struct BindingIssue {
    pub severity: IssueSeverity,
    pub operation: String,
    pub message: String,
}

/// Check every declared operation of a definition against the registry.
///
/// Errors: declared operation unknown, or its capabilities are not
/// covered. Warning: a capability the container carries that no declared
/// operation uses (harmless, usually a stale library entry).
pub fn validate_container_operations(
    def: &ContainerDefinition,
    registry: &OperationRegistry,
) -> Vec<BindingIssue> {
    let mut issues = Vec::new();

    for spec in &def.operations {
        let Some(op) = registry.get(&spec.op) else {
            issues.push(BindingIssue {
                severity: IssueSeverity::Error,
                operation: spec.op.clone(),
                message: format!("unknown operation {}", spec.op),
            });
            continue;
        };
        for capability in op.required_capabilities() {
            if !def.has_capability(capability) {
                issues.push(BindingIssue {
                    severity: IssueSeverity::Error,
                    operation: spec.op.clone(),
                    message: format!(
                        "operation {} requires capability {capability} the container lacks",
                        spec.op
                    ),
                });
            }
        }
    }

    if !def.operations.is_empty() {
        for capability in &def.capabilities {
            let used = def.operations.iter().any(|spec| {
                registry
                    .get(&spec.op)
                    .is_some_and(|op| op.required_capabilities().contains(&capability.as_str()))
            });
            if !used {
                issues.push(BindingIssue {
                    severity: IssueSeverity::Warning,
                    operation: String::new(),
                    message: format!("capability {capability} is not used by any declared operation"),
                });
            }
        }
    }

    issues
}

/// Like [`validate_container_operations`] but fails on the first error.
pub fn assert_container_operations(
    def: &ContainerDefinition,
    registry: &OperationRegistry,
) -> Result<(), BindingError> {
    for spec in &def.operations {
        let op = registry
            .get(&spec.op)
            .ok_or_else(|| BindingError::UnknownOperation(spec.op.clone()))?;
        check_capabilities(def, spec.op.as_str(), op.required_capabilities())?;
    }
    Ok(())
}

/// May `op_id` run on this container right now?
pub fn container_allows_operation(
    def: &ContainerDefinition,
    op_id: &str,
    registry: &OperationRegistry,
) -> Result<(), BindingError> {
    let op = registry
        .get(op_id)
        .ok_or_else(|| BindingError::UnknownOperation(op_id.to_string()))?;
    check_capabilities(def, op_id, op.required_capabilities())?;
    if !def.declares_operation(op_id) {
        return Err(BindingError::OperationNotDeclared {
            container: def.id.clone(),
            operation: op_id.to_string(),
        });
    }
    Ok(())
}

fn check_capabilities(
    def: &ContainerDefinition,
    op_id: &str,
    required: &[&str],
) -> Result<(), BindingError> {
    for capability in required {
        if !def.has_capability(capability) {
            return Err(BindingError::CapabilityMissing {
                container: def.id.clone(),
                operation: op_id.to_string(),
                capability: capability.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "binding_tests.rs"]
mod tests;
