// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named page states that gate workflow progress.

use serde::{Deserialize, Serialize};

/// Closed set of page states a platform detector can report.
///
/// `RiskControl` and `Offsite` are terminal: enforcement never attempts
/// automated recovery from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    HomeReady,
    SearchReady,
    DetailReady,
    CommentsReady,
    LoginGuard,
    RiskControl,
    Offsite,
    Unknown,
}

crate::simple_display! {
    Checkpoint {
        HomeReady => "home_ready",
        SearchReady => "search_ready",
        DetailReady => "detail_ready",
        CommentsReady => "comments_ready",
        LoginGuard => "login_guard",
        RiskControl => "risk_control",
        Offsite => "offsite",
        Unknown => "unknown",
    }
}

impl Checkpoint {
    /// Terminal states: no automated recovery, escalate to the operator.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Checkpoint::RiskControl | Checkpoint::Offsite)
    }

    /// The nearest-lower enforcement target, used for one-level-up fallback.
    pub fn fallback(&self) -> Option<Checkpoint> {
        match self {
            Checkpoint::SearchReady => Some(Checkpoint::HomeReady),
            Checkpoint::CommentsReady => Some(Checkpoint::DetailReady),
            Checkpoint::DetailReady => Some(Checkpoint::SearchReady),
            _ => None,
        }
    }

    /// States reachable by the ESC recovery action (modal layers).
    pub fn is_overlay(&self) -> bool {
        matches!(self, Checkpoint::DetailReady | Checkpoint::CommentsReady)
    }

    pub fn parse(s: &str) -> Option<Checkpoint> {
        Some(match s {
            "home_ready" => Checkpoint::HomeReady,
            "search_ready" => Checkpoint::SearchReady,
            "detail_ready" => Checkpoint::DetailReady,
            "comments_ready" => Checkpoint::CommentsReady,
            "login_guard" => Checkpoint::LoginGuard,
            "risk_control" => Checkpoint::RiskControl,
            "offsite" => Checkpoint::Offsite,
            "unknown" => Checkpoint::Unknown,
            _ => return None,
        })
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
