// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable error taxonomy shared by every crate in the workspace.
//!
//! Programmer errors (binding violations, bad arguments, invalid library)
//! surface as typed `Err` values at registration or enqueue time.
//! Environmental failures travel as [`Fault`] records inside
//! `{success: false}` results through blocks and the workflow executor.

use serde::{Deserialize, Serialize};

/// Stable error kinds. Consumers match on these, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Container library root missing on disk
    LibraryNotFound,
    /// Duplicate ids, cyclic children, or malformed definitions
    LibraryInvalid,
    /// Bridge jitter during a match pass; caller may retry
    MatchTransient,
    /// Malformed bridge response during a match pass; fatal for the step
    MatchInvalid,
    /// Container capabilities do not cover the operation's requirements
    CapabilityMissing,
    /// Container declares an operations list that omits the operation
    OperationNotDeclared,
    /// Non-serializable argument handed to `evaluate`
    ContextBadArg,
    /// Queue has no configured context provider
    NoContextProvider,
    /// Operation `run` returned an error
    OperationFailed,
    /// `ensure` timed out without reaching the target checkpoint
    CheckpointUnreachable,
    /// `ensure` reached only a one-level-up fallback checkpoint
    CheckpointFallback,
    /// Platform risk-control page; terminal, operator must intervene
    RiskControl,
    /// Navigated off the platform host; terminal
    Offsite,
    /// Bridge connection closed or never established
    BridgeClosed,
    /// Bridge returned a payload the core cannot interpret
    BridgeProtocol,
}

crate::simple_display! {
    ErrorKind {
        LibraryNotFound => "LIBRARY_NOT_FOUND",
        LibraryInvalid => "LIBRARY_INVALID",
        MatchTransient => "MATCH_TRANSIENT",
        MatchInvalid => "MATCH_INVALID",
        CapabilityMissing => "CAPABILITY_MISSING",
        OperationNotDeclared => "OPERATION_NOT_DECLARED",
        ContextBadArg => "CONTEXT_BAD_ARG",
        NoContextProvider => "NO_CONTEXT_PROVIDER",
        OperationFailed => "OPERATION_FAILED",
        CheckpointUnreachable => "CHECKPOINT_UNREACHABLE",
        CheckpointFallback => "CHECKPOINT_FALLBACK",
        RiskControl => "RISK_CONTROL",
        Offsite => "OFFSITE",
        BridgeClosed => "BRIDGE_CLOSED",
        BridgeProtocol => "BRIDGE_PROTOCOL",
    }
}

impl ErrorKind {
    /// Terminal kinds short-circuit recovery; the operator takes over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ErrorKind::RiskControl | ErrorKind::Offsite)
    }

    /// Kinds a caller may retry without operator involvement.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::MatchTransient)
    }
}

/// A typed failure record carried inside `{success: false, error}` results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Fault {
    pub kind: ErrorKind,
    pub message: String,
}

impl Fault {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
