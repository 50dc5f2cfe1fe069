// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bridge RPC seam.

use crate::error::BridgeError;
use async_trait::async_trait;
use serde_json::Value;

/// Client side of the browser service RPC surface.
///
/// Methods the core uses: `evaluate`, `browser:execute`,
/// `container:operation`, `keyboard:type`, `keyboard:press`,
/// `system:mouse_move`, `system:mouse_click`, `system:mouse_wheel`,
/// `goto`, `page:back`, `session:create`, `session:list`.
///
/// Every call may suspend; callers must not issue overlapping calls for
/// the same profile (the context provider serializes them).
#[async_trait]
pub trait Bridge: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, BridgeError>;
}
