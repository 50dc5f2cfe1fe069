// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted bridge for tests (behind the `test-support` feature).

use crate::error::BridgeError;
use crate::transport::Bridge;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

type Handler = Arc<dyn Fn(&Value) -> Result<Value, BridgeError> + Send + Sync>;

/// In-memory [`Bridge`] with per-method handlers and a call log.
///
/// Unhandled methods answer `null` so incidental calls (keyboard, mouse)
/// succeed without scripting.
#[derive(Clone, Default)]
pub struct FakeBridge {
    handlers: Arc<Mutex<HashMap<String, Handler>>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    fail_all: Arc<Mutex<Option<String>>>,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a method with a handler over its params.
    pub fn handle(
        &self,
        method: &str,
        handler: impl Fn(&Value) -> Result<Value, BridgeError> + Send + Sync + 'static,
    ) {
        self.handlers
            .lock()
            .insert(method.to_string(), Arc::new(handler));
    }

    /// Script a method with a fixed response.
    pub fn respond(&self, method: &str, response: Value) {
        self.handle(method, move |_| Ok(response.clone()));
    }

    /// Make every call fail with a remote error (connection jitter).
    pub fn fail_with(&self, message: &str) {
        *self.fail_all.lock() = Some(message.to_string());
    }

    /// Clear a previous `fail_with`.
    pub fn recover(&self) {
        *self.fail_all.lock() = None;
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Calls for one method, in order.
    pub fn calls_for(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl Bridge for FakeBridge {
    async fn call(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        self.calls.lock().push((method.to_string(), params.clone()));

        if let Some(message) = self.fail_all.lock().clone() {
            return Err(BridgeError::Remote(message));
        }

        let handler = self.handlers.lock().get(method).cloned();
        match handler {
            Some(handler) => handler(&params),
            None => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
