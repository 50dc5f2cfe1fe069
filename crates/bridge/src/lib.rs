// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-bridge: the seam to the external browser service.
//!
//! The browser (Playwright/Camoufox behind an HTTP+WS service) is an
//! external collaborator; this crate holds its client-side contract: the
//! [`Bridge`] RPC trait, the WebSocket implementation, and the
//! [`OperationContext`] surface operations run against.

mod context;
mod error;
mod permit;
mod sessions;
mod transport;
mod ws;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use context::{BridgeContextProvider, ContextProvider, Keyboard, OperationContext, Page, SystemInput};
pub use error::BridgeError;
pub use permit::{NoopPermitService, PermitService, RateLimitPermit};
pub use sessions::SessionManager;
pub use transport::Bridge;
pub use ws::WsBridge;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBridge;
