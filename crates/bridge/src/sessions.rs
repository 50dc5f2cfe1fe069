// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session helpers over the bridge's `session:*` methods.

use crate::error::BridgeError;
use crate::transport::Bridge;
use drover_core::ProfileId;
use serde_json::{json, Value};
use std::sync::Arc;

/// Create and enumerate browser sessions. One active DOM per profile.
pub struct SessionManager {
    bridge: Arc<dyn Bridge>,
}

impl SessionManager {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self { bridge }
    }

    /// Ask the browser service for a fresh session.
    pub async fn create(&self) -> Result<ProfileId, BridgeError> {
        let result = self.bridge.call("session:create", json!({})).await?;
        result
            .get("profile")
            .and_then(Value::as_str)
            .map(ProfileId::from)
            .ok_or_else(|| BridgeError::Protocol("session:create missing profile".into()))
    }

    /// Profiles the browser service currently holds.
    pub async fn list(&self) -> Result<Vec<ProfileId>, BridgeError> {
        let result = self.bridge.call("session:list", json!({})).await?;
        let profiles = result
            .get("profiles")
            .and_then(Value::as_array)
            .ok_or_else(|| BridgeError::Protocol("session:list missing profiles".into()))?;
        Ok(profiles
            .iter()
            .filter_map(Value::as_str)
            .map(ProfileId::from)
            .collect())
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
