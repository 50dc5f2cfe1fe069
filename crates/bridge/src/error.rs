// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge error types.

use drover_core::{ErrorKind, Fault};

/// Errors surfaced by bridge calls.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge connection failed: {0}")]
    Connect(String),

    #[error("bridge connection closed")]
    Closed,

    #[error("bridge call timed out: {0}")]
    Timeout(String),

    /// The remote executed the call and reported `{success: false}`.
    #[error("bridge remote error: {0}")]
    Remote(String),

    /// The remote answered with a payload the core cannot interpret.
    #[error("bridge protocol error: {0}")]
    Protocol(String),

    /// A caller handed `evaluate` an argument that does not serialize.
    #[error("bad evaluate argument: {0}")]
    BadArg(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Connect(_) | BridgeError::Closed | BridgeError::Timeout(_) => {
                ErrorKind::BridgeClosed
            }
            BridgeError::Remote(_) => ErrorKind::OperationFailed,
            BridgeError::Protocol(_) => ErrorKind::BridgeProtocol,
            BridgeError::BadArg(_) => ErrorKind::ContextBadArg,
        }
    }

    pub fn into_fault(self) -> Fault {
        Fault::new(self.kind(), self.to_string())
    }
}
