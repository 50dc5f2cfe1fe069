// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint detection and conservative enforcement.
//!
//! URL alone may lie and DOM alone may lie, so detection combines both.
//! Recovery is deliberately narrow: keyboard ESC only, never clicks, and
//! terminal states (`risk_control`, `offsite`) short-circuit straight to
//! the operator.

mod rules;

pub use rules::CheckpointRules;

use crate::matcher::Matcher;
use drover_bridge::OperationContext;
use drover_core::{Checkpoint, ContainerSnapshot, ErrorKind, Fault};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Knobs for [`CheckpointMachine::ensure`].
#[derive(Debug, Clone)]
pub struct EnsureOptions {
    pub timeout_ms: u64,
    pub check_interval_ms: u64,
    pub allow_one_level_up_fallback: bool,
}

impl Default for EnsureOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            check_interval_ms: 500,
            allow_one_level_up_fallback: false,
        }
    }
}

/// One recovery action taken during `ensure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub action: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Attempt {
    fn ok(action: &str) -> Self {
        Self { action: action.to_string(), ok: true, reason: None }
    }

    fn failed(action: &str, reason: impl Into<String>) -> Self {
        Self { action: action.to_string(), ok: false, reason: Some(reason.into()) }
    }
}

/// Outcome of one `ensure` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsureReport {
    pub target: Checkpoint,
    pub success: bool,
    pub reached: Checkpoint,
    pub attempts: Vec<Attempt>,
}

impl EnsureReport {
    /// The typed failure for an unsuccessful report, if any.
    pub fn fault(&self) -> Option<Fault> {
        if self.success {
            return None;
        }
        let kind = match self.reached {
            Checkpoint::RiskControl => ErrorKind::RiskControl,
            Checkpoint::Offsite => ErrorKind::Offsite,
            _ if self.attempts.iter().any(|a| a.action == "need_user_action") => {
                ErrorKind::CheckpointFallback
            }
            _ => ErrorKind::CheckpointUnreachable,
        };
        Some(Fault::new(
            kind,
            format!("wanted {}, reached {}", self.target, self.reached),
        ))
    }
}

enum LevelOutcome {
    Reached,
    Terminal(Checkpoint),
    TimedOut(Checkpoint),
}

/// Detects and enforces checkpoints for one platform.
pub struct CheckpointMachine {
    rules: CheckpointRules,
    matcher: Arc<Matcher>,
}

impl CheckpointMachine {
    pub fn new(rules: CheckpointRules, matcher: Arc<Matcher>) -> Self {
        Self { rules, matcher }
    }

    pub fn rules(&self) -> &CheckpointRules {
        &self.rules
    }

    /// Current URL straight from the page; snapshots must never trust a
    /// stale caller-supplied URL.
    async fn current_url(&self, ctx: &OperationContext) -> Result<String, Fault> {
        let value = ctx
            .page()
            .evaluate("() => location.href", json!([]))
            .await
            .map_err(|e| e.into_fault())?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Fault::new(ErrorKind::MatchInvalid, "location.href was not a string"))
    }

    /// One detection pass: match, then classify.
    pub async fn detect(
        &self,
        ctx: &OperationContext,
    ) -> Result<(Checkpoint, ContainerSnapshot), Fault> {
        let url = self.current_url(ctx).await?;
        let snapshot = self
            .matcher
            .snapshot(ctx, &url, None)
            .await
            .map_err(|e| Fault::new(e.kind(), e.to_string()))?;
        let checkpoint = self.rules.detect(&snapshot);
        tracing::debug!(%checkpoint, url = %snapshot.url, "checkpoint detected");
        Ok((checkpoint, snapshot))
    }

    /// Drive the page toward `target`, with ESC-only recovery.
    ///
    /// Terminal states return immediately with `success: false` and no
    /// attempts. On timeout with fallback allowed, the nearest-lower
    /// target is tried; reaching it still reports `success: false`.
    pub async fn ensure(
        &self,
        ctx: &OperationContext,
        target: Checkpoint,
        opts: EnsureOptions,
    ) -> EnsureReport {
        let mut attempts = Vec::new();
        let mut level_target = target;

        loop {
            let outcome = self
                .ensure_level(ctx, level_target, &opts, &mut attempts)
                .await;
            match outcome {
                LevelOutcome::Reached => {
                    return EnsureReport {
                        target,
                        success: level_target == target,
                        reached: level_target,
                        attempts,
                    };
                }
                LevelOutcome::Terminal(reached) => {
                    return EnsureReport { target, success: false, reached, attempts };
                }
                LevelOutcome::TimedOut(reached) => {
                    if opts.allow_one_level_up_fallback {
                        if let Some(fallback) = level_target.fallback() {
                            attempts.push(Attempt::failed(
                                "need_user_action",
                                format!("need to reach {level_target}"),
                            ));
                            level_target = fallback;
                            continue;
                        }
                    }
                    return EnsureReport { target, success: false, reached, attempts };
                }
            }
        }
    }

    async fn ensure_level(
        &self,
        ctx: &OperationContext,
        target: Checkpoint,
        opts: &EnsureOptions,
        attempts: &mut Vec<Attempt>,
    ) -> LevelOutcome {
        let start = std::time::Instant::now();
        let mut last = Checkpoint::Unknown;

        loop {
            match self.detect(ctx).await {
                Ok((current, _snapshot)) => {
                    last = current;
                    if current == target {
                        return LevelOutcome::Reached;
                    }
                    if current.is_terminal() {
                        return LevelOutcome::Terminal(current);
                    }
                    if start.elapsed().as_millis() as u64 >= opts.timeout_ms {
                        return LevelOutcome::TimedOut(current);
                    }
                    // Only modal layers are recoverable, and only toward
                    // list-level targets. ESC is the sole action: clicks
                    // navigate, and navigation is what we must not fake.
                    if current.is_overlay()
                        && matches!(target, Checkpoint::HomeReady | Checkpoint::SearchReady)
                    {
                        match ctx.page().keyboard().press("Escape").await {
                            Ok(_) => attempts.push(Attempt::ok("esc")),
                            Err(e) => attempts.push(Attempt::failed("esc", e.to_string())),
                        }
                    }
                }
                Err(fault) => {
                    attempts.push(Attempt::failed("detect", fault.to_string()));
                    if start.elapsed().as_millis() as u64 >= opts.timeout_ms {
                        return LevelOutcome::TimedOut(last);
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(opts.check_interval_ms)).await;
        }
    }
}

/// Convenience: serialize a report for workflow context merging.
pub fn report_to_value(report: &EnsureReport) -> Value {
    serde_json::to_value(report).unwrap_or(Value::Null)
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
