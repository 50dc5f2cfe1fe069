// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uniform surface operations run against.
//!
//! One [`OperationContext`] per (profile, task). All bridge traffic for a
//! profile flows through a shared per-profile gate: the browser session is
//! the scarce resource, and overlapping calls on one session are not
//! allowed.

use crate::error::BridgeError;
use crate::transport::Bridge;
use async_trait::async_trait;
use drover_core::{Fault, ProfileId};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Supplies operation contexts for a profile.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn context_for(&self, profile: &ProfileId) -> Result<OperationContext, Fault>;
}

/// Everything an operation may touch.
#[derive(Clone)]
pub struct OperationContext {
    profile: ProfileId,
    bridge: Arc<dyn Bridge>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl OperationContext {
    pub fn new(profile: ProfileId, bridge: Arc<dyn Bridge>) -> Self {
        Self {
            profile,
            bridge,
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn with_gate(profile: ProfileId, bridge: Arc<dyn Bridge>, gate: Arc<tokio::sync::Mutex<()>>) -> Self {
        Self { profile, bridge, gate }
    }

    pub fn profile(&self) -> &ProfileId {
        &self.profile
    }

    pub fn page(&self) -> Page<'_> {
        Page { ctx: self }
    }

    pub fn system_input(&self) -> SystemInput<'_> {
        SystemInput { ctx: self }
    }

    /// Serialized bridge call. Holds the profile gate across the await so
    /// calls on one session never overlap.
    pub(crate) async fn call(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        let _gate = self.gate.lock().await;
        self.bridge.call(method, params).await
    }
}

/// Page-level surface: script evaluation and keyboard input.
pub struct Page<'a> {
    ctx: &'a OperationContext,
}

impl Page<'_> {
    /// Evaluate a script in the page. Single-shot: no persistent JS scope
    /// survives between calls.
    ///
    /// Arguments must be JSON-serializable; anything else fails with a
    /// bad-arg error rather than silently coercing.
    pub async fn evaluate<A: Serialize>(
        &self,
        script: &str,
        args: A,
    ) -> Result<Value, BridgeError> {
        let args = serde_json::to_value(args).map_err(|e| BridgeError::BadArg(e.to_string()))?;
        self.ctx
            .call(
                "evaluate",
                json!({
                    "profile": self.ctx.profile,
                    "script": script,
                    "args": args,
                }),
            )
            .await
    }

    pub fn keyboard(&self) -> Keyboard<'_> {
        Keyboard { ctx: self.ctx }
    }

    pub async fn goto(&self, url: &str) -> Result<Value, BridgeError> {
        self.ctx
            .call("goto", json!({ "profile": self.ctx.profile, "url": url }))
            .await
    }

    pub async fn back(&self) -> Result<Value, BridgeError> {
        self.ctx
            .call("page:back", json!({ "profile": self.ctx.profile }))
            .await
    }
}

/// Text input through the page keyboard.
pub struct Keyboard<'a> {
    ctx: &'a OperationContext,
}

impl Keyboard<'_> {
    pub async fn type_text(&self, text: &str) -> Result<Value, BridgeError> {
        self.ctx
            .call("keyboard:type", json!({ "profile": self.ctx.profile, "text": text }))
            .await
    }

    pub async fn press(&self, key: &str) -> Result<Value, BridgeError> {
        self.ctx
            .call("keyboard:press", json!({ "profile": self.ctx.profile, "key": key }))
            .await
    }
}

/// OS-level pointer input, used by click paths to reduce detection surface.
pub struct SystemInput<'a> {
    ctx: &'a OperationContext,
}

impl SystemInput<'_> {
    pub async fn mouse_move(&self, x: f64, y: f64) -> Result<Value, BridgeError> {
        self.ctx
            .call("system:mouse_move", json!({ "profile": self.ctx.profile, "x": x, "y": y }))
            .await
    }

    pub async fn mouse_click(&self, x: f64, y: f64) -> Result<Value, BridgeError> {
        self.ctx
            .call("system:mouse_click", json!({ "profile": self.ctx.profile, "x": x, "y": y }))
            .await
    }

    pub async fn mouse_wheel(&self, dx: f64, dy: f64) -> Result<Value, BridgeError> {
        self.ctx
            .call(
                "system:mouse_wheel",
                json!({ "profile": self.ctx.profile, "dx": dx, "dy": dy }),
            )
            .await
    }
}

/// Provider backed by a live bridge; one gate per profile.
pub struct BridgeContextProvider {
    bridge: Arc<dyn Bridge>,
    gates: Mutex<HashMap<ProfileId, Arc<tokio::sync::Mutex<()>>>>,
}

impl BridgeContextProvider {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self { bridge, gates: Mutex::new(HashMap::new()) }
    }

    fn gate_for(&self, profile: &ProfileId) -> Arc<tokio::sync::Mutex<()>> {
        self.gates
            .lock()
            .entry(profile.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl ContextProvider for BridgeContextProvider {
    async fn context_for(&self, profile: &ProfileId) -> Result<OperationContext, Fault> {
        let gate = self.gate_for(profile);
        Ok(OperationContext::with_gate(profile.clone(), self.bridge.clone(), gate))
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
