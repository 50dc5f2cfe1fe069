// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation definitions and the process-wide registry.
//!
//! Polymorphism over operations is the registry's id→definition map; there
//! is no inheritance chain. Each operation declares the capabilities a
//! container must carry, and an async `run` whose side effects are scoped
//! to the supplied context.

mod builtin;
mod extract;

pub use builtin::register_builtin;
pub use extract::ExtractOp;

use async_trait::async_trait;
use drover_bridge::OperationContext;
use drover_core::Fault;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// A named unit of work against a container's matched node.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Registry id ("click", "extract", "find-child", ...)
    fn id(&self) -> &'static str;

    /// Capabilities the target container must carry.
    fn required_capabilities(&self) -> &'static [&'static str];

    /// Execute against the context. Effects must stay inside `ctx`.
    async fn run(&self, ctx: &OperationContext, config: &Map<String, Value>)
        -> Result<Value, Fault>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("operation already registered: {0}")]
    Duplicate(String),
}

/// Global table of named operations.
///
/// Process-wide via [`OperationRegistry::global`], but tests construct
/// isolated instances with [`OperationRegistry::new`].
#[derive(Default)]
pub struct OperationRegistry {
    operations: Mutex<HashMap<String, Arc<dyn Operation>>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry with built-ins installed.
    pub fn global() -> Arc<OperationRegistry> {
        static GLOBAL: OnceLock<Arc<OperationRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                let registry = OperationRegistry::new();
                registry.ensure_builtin();
                Arc::new(registry)
            })
            .clone()
    }

    /// Install the built-in set. Idempotent.
    pub fn ensure_builtin(&self) {
        register_builtin(self);
    }

    pub fn register(&self, op: Arc<dyn Operation>) -> Result<(), RegistryError> {
        let mut operations = self.operations.lock();
        let id = op.id().to_string();
        if operations.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        operations.insert(id, op);
        Ok(())
    }

    /// Register only if absent (used by `ensure_builtin`).
    pub(crate) fn register_if_absent(&self, op: Arc<dyn Operation>) {
        let mut operations = self.operations.lock();
        operations.entry(op.id().to_string()).or_insert(op);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Operation>> {
        self.operations.lock().get(id).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.operations.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// The DOM target injected by the caller: the live node path the matcher
/// resolved for this instance (`node_ref`), and the winning CSS selector
/// as a fallback for when the path has gone stale.
pub(crate) struct Target {
    pub node_ref: Option<String>,
    pub selector: Option<String>,
}

impl Target {
    pub fn describe(&self) -> &str {
        self.node_ref
            .as_deref()
            .or(self.selector.as_deref())
            .unwrap_or("<no target>")
    }
}

pub(crate) fn target_of(config: &Map<String, Value>) -> Result<Target, Fault> {
    let node_ref = config
        .get("node_ref")
        .and_then(Value::as_str)
        .map(str::to_string);
    let selector = config
        .get("selector")
        .and_then(Value::as_str)
        .map(str::to_string);
    if node_ref.is_none() && selector.is_none() {
        return Err(Fault::new(
            drover_core::ErrorKind::OperationFailed,
            "config carries neither node_ref nor selector",
        ));
    }
    Ok(Target { node_ref, selector })
}

/// JS helpers shared by element-targeted operations.
///
/// `fromPath` resolves a matcher DOM path (`"root/body[0]/div[3]"`) back
/// to its node; `locate` prefers the live path and falls back to a CSS
/// query only when the path no longer resolves; `pathOf` is the inverse
/// of `fromPath`, producing the same stable paths the matcher records.
pub(crate) const LOCATE_FNS: &str = r"
  function fromPath(path) {
    if (!path) return null;
    let node = document.documentElement;
    for (const part of path.split('/').slice(1)) {
      const m = part.match(/^(.*)\[(\d+)\]$/);
      if (!m) return null;
      const children = Array.from(node.children).filter((c) => c.tagName.toLowerCase() === m[1]);
      node = children[Number(m[2])];
      if (!node) return null;
    }
    return node;
  }
  function locate(nodeRef, sel) {
    if (nodeRef) {
      const hit = fromPath(nodeRef);
      if (hit) return hit;
    }
    return sel ? document.querySelector(sel) : null;
  }
  function pathOf(el) {
    const parts = [];
    let node = el;
    while (node && node.parentElement) {
      const tag = node.tagName.toLowerCase();
      const siblings = Array.from(node.parentElement.children).filter(
        (c) => c.tagName.toLowerCase() === tag
      );
      parts.unshift(tag + '[' + siblings.indexOf(node) + ']');
      node = node.parentElement;
    }
    return 'root/' + parts.join('/');
  }
";

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
