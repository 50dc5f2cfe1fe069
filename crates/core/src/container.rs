// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container definitions, live instances, and match snapshots.
//!
//! A container is a named page region: a selector set, a capability set,
//! and the operations the region permits. Definitions are durable (loaded
//! from the on-disk library); instances are live bindings produced by a
//! match pass and never mutated in place across matches.

use crate::error::Fault;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for a live container instance bound by the matcher.
    ///
    /// A fresh ID is minted on every match pass; invalidation removes the
    /// instance rather than mutating it.
    pub struct InstanceId("ins-");
}

/// Whether a selector is the preferred form or a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectorVariant {
    #[default]
    Primary,
    Fallback,
}

crate::simple_display! {
    SelectorVariant {
        Primary => "primary",
        Fallback => "fallback",
    }
}

/// A single CSS selector with its variant tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub css: String,
    #[serde(default)]
    pub variant: SelectorVariant,
}

impl Selector {
    pub fn primary(css: impl Into<String>) -> Self {
        Self { css: css.into(), variant: SelectorVariant::Primary }
    }

    pub fn fallback(css: impl Into<String>) -> Self {
        Self { css: css.into(), variant: SelectorVariant::Fallback }
    }
}

/// An operation the container permits, with its default config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Operation id (e.g. "click", "extract")
    #[serde(rename = "type")]
    pub op: String,
    /// Default config merged under caller-supplied config at dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

impl OperationSpec {
    pub fn new(op: impl Into<String>) -> Self {
        Self { op: op.into(), config: None }
    }

    pub fn with_config(op: impl Into<String>, config: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { op: op.into(), config: Some(config) }
    }
}

/// The durable description of a page region.
///
/// Ids are dot-paths encoding nesting (`site_detail.comment_section.item`);
/// only roots carry a `root_pattern`. The library loader enforces the
/// structural invariants (prefix nesting, acyclic children, single parent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    /// Globally unique dot-path id
    pub id: String,
    /// Platform key (e.g. "xiaohongshu", "weibo")
    pub site: String,
    /// URL glob/regex; present on roots only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_pattern: Option<String>,
    /// Ordered selector list; primary selectors are tried before fallbacks
    #[serde(default)]
    pub selectors: Vec<Selector>,
    /// Interaction classes this region supports ("click", "scroll", ...)
    #[serde(default)]
    pub capabilities: Vec<SmolStr>,
    /// Operations permitted on this container, with default configs.
    /// An empty list means "no declaration": any operation whose
    /// capabilities are covered is allowed.
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
    /// Ordered child container ids; must mirror on-disk nesting
    #[serde(default)]
    pub children: Vec<String>,
    /// Open map (auto_click, list_role, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ContainerDefinition {
    /// Roots are the only containers carrying a URL pattern.
    pub fn is_root(&self) -> bool {
        self.root_pattern.is_some()
    }

    /// Parent id per the dot-path convention, if nested.
    pub fn parent_id(&self) -> Option<&str> {
        self.id.rsplit_once('.').map(|(parent, _)| parent)
    }

    pub fn has_capability(&self, cap: &str) -> bool {
        self.capabilities.iter().any(|c| c == cap)
    }

    /// True when the operations list names `op` (or no list is declared).
    pub fn declares_operation(&self, op: &str) -> bool {
        self.operations.is_empty() || self.operations.iter().any(|spec| spec.op == op)
    }

    /// Container-declared default config for an operation, if any.
    pub fn default_config_for(&self, op: &str) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.operations
            .iter()
            .find(|spec| spec.op == op)
            .and_then(|spec| spec.config.as_ref())
    }
}

/// A live binding of a definition to a DOM node path in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerInstance {
    pub id: InstanceId,
    pub definition_id: String,
    /// Opaque DOM path (`"root/elem[3]/..."`); absent when nothing matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ref: Option<String>,
    /// CSS of the selector that won, for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    pub url: String,
    pub match_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_instance_id: Option<InstanceId>,
    #[serde(default)]
    pub children: Vec<InstanceId>,
}

impl ContainerInstance {
    pub fn is_matched(&self) -> bool {
        self.match_count >= 1
    }
}

/// Skeleton of the page DOM captured alongside a match pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomNode {
    pub tag: String,
    pub node_ref: String,
    #[serde(default)]
    pub children: Vec<DomNode>,
}

/// Minimal DOM signals the matcher exposes to the checkpoint detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageSignals {
    #[serde(default)]
    pub has_detail_mask: bool,
    #[serde(default)]
    pub has_search_input: bool,
    #[serde(default)]
    pub ready_state: String,
    #[serde(default)]
    pub title: String,
}

/// The deepest root that matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootMatch {
    pub container_id: String,
    pub instance_id: InstanceId,
    pub match_count: usize,
}

/// Value object returned by a match pass. Pure, immutable, transportable.
///
/// `instances` is in parent-before-child order and retains zero-match
/// candidates (so downstream code can reason about expected-but-absent
/// regions); `matched_ids` flattens the definitions with at least one hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_match: Option<RootMatch>,
    pub instances: Vec<ContainerInstance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_tree: Option<DomNode>,
    pub matched_ids: Vec<String>,
    #[serde(default)]
    pub signals: PageSignals,
}

impl ContainerSnapshot {
    /// The instance bound to a definition id, if the candidate was evaluated.
    pub fn instance_for(&self, definition_id: &str) -> Option<&ContainerInstance> {
        self.instances.iter().find(|i| i.definition_id == definition_id)
    }

    /// True when the definition matched at least one DOM node.
    pub fn matched(&self, definition_id: &str) -> bool {
        self.matched_ids.iter().any(|id| id == definition_id)
    }

    /// True when any matched id's last dot-segment equals `segment`.
    ///
    /// Checkpoint rules use this for anchor families like `*.login_anchor`.
    pub fn matched_segment(&self, segment: &str) -> bool {
        self.matched_ids
            .iter()
            .any(|id| id == segment || id.rsplit_once('.').is_some_and(|(_, last)| last == segment))
    }

    /// True when the candidate set contains the segment at all (matched or not).
    pub fn candidate_segment(&self, segment: &str) -> bool {
        self.instances.iter().any(|i| {
            i.definition_id == segment
                || i.definition_id.rsplit_once('.').is_some_and(|(_, last)| last == segment)
        })
    }

    pub fn root_container_id(&self) -> Option<&str> {
        self.root_match.as_ref().map(|r| r.container_id.as_str())
    }
}

/// Outcome record blocks and operations hand back to the executor.
///
/// Runtime failures are values, not panics: `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Fault>,
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl Outcome {
    pub fn ok() -> Self {
        Self { success: true, error: None, fields: HashMap::new() }
    }

    pub fn ok_with(fields: HashMap<String, serde_json::Value>) -> Self {
        Self { success: true, error: None, fields }
    }

    pub fn fail(error: Fault) -> Self {
        Self { success: false, error: Some(error), fields: HashMap::new() }
    }

    pub fn fail_with(error: Fault, fields: HashMap<String, serde_json::Value>) -> Self {
        Self { success: false, error: Some(error), fields }
    }
}

crate::builder! {
    pub struct ContainerDefinitionBuilder => ContainerDefinition {
        into {
            id: String = "site_home",
            site: String = "xiaohongshu",
        }
        set {
            selectors: Vec<Selector> = vec![Selector::primary("body")],
            capabilities: Vec<SmolStr> = Vec::new(),
            operations: Vec<OperationSpec> = Vec::new(),
            children: Vec<String> = Vec::new(),
            metadata: serde_json::Map<String, serde_json::Value> = serde_json::Map::new(),
        }
        option {
            root_pattern: String = None,
        }
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
