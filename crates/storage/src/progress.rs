// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only progress event store.
//!
//! Cross-process observability for runs: every record is one JSON line.
//! Appends are best-effort by design; read paths scan only a bounded tail
//! of the file so replay memory stays flat regardless of log age.

use chrono::{SecondsFormat, Utc};
use drover_core::{ProfileId, RunId, DEFAULT_EVENT_REPLAY_MAX_BYTES};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// How the emitting process was driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Workflow,
    Manual,
    Replay,
}

drover_core::simple_display! {
    RunMode {
        Workflow => "workflow",
        Manual => "manual",
        Replay => "replay",
    }
}

/// One progress record. `seq` is strictly monotonic per process;
/// consumers must not parse it beyond ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// ISO-8601 timestamp
    pub ts: String,
    pub seq: u64,
    /// Emitting process identity (e.g. "drover-cli", "drover-daemon")
    pub source: String,
    pub mode: RunMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<ProfileId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// Event topic ("task:completed", "checkpoint:detected", ...)
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Append-only JSONL progress store.
///
/// Built per-process via the constructor (no global); errors on append
/// are swallowed after a warning.
pub struct ProgressStore {
    path: PathBuf,
    source: String,
    max_replay_bytes: u64,
    seq: AtomicU64,
    /// Serializes appends so lines never interleave.
    write_gate: Mutex<()>,
}

impl ProgressStore {
    pub fn open(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            max_replay_bytes: DEFAULT_EVENT_REPLAY_MAX_BYTES,
            seq: AtomicU64::new(0),
            write_gate: Mutex::new(()),
        }
    }

    pub fn with_max_replay_bytes(mut self, bytes: u64) -> Self {
        self.max_replay_bytes = bytes;
        self
    }

    /// Append one event. Best-effort: failures are logged and swallowed.
    pub fn append(
        &self,
        mode: RunMode,
        profile_id: Option<&ProfileId>,
        run_id: Option<&RunId>,
        event: &str,
        payload: serde_json::Value,
    ) -> Option<ProgressRecord> {
        let record = ProgressRecord {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            source: self.source.clone(),
            mode,
            profile_id: profile_id.cloned(),
            run_id: run_id.copied(),
            event: event.to_string(),
            payload,
        };

        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(%e, "progress record did not serialize");
                return None;
            }
        };

        let _gate = self.write_gate.lock();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), %e, "progress append failed");
        }
        Some(record)
    }

    /// Read the most recent `limit` records, scanning at most the
    /// configured tail of the file.
    pub fn read_recent(&self, limit: usize) -> Vec<ProgressRecord> {
        let Ok(mut file) = std::fs::File::open(&self.path) else {
            return Vec::new();
        };
        let len = match file.metadata() {
            Ok(meta) => meta.len(),
            Err(_) => return Vec::new(),
        };

        let start = len.saturating_sub(self.max_replay_bytes);
        if file.seek(SeekFrom::Start(start)).is_err() {
            return Vec::new();
        }
        let mut tail = String::new();
        if file.read_to_string(&mut tail).is_err() {
            return Vec::new();
        }

        let mut lines: Vec<&str> = tail.lines().collect();
        // A mid-record cut leaves a partial first line; drop it.
        if start > 0 && !lines.is_empty() {
            lines.remove(0);
        }

        let records: Vec<ProgressRecord> = lines
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = records.len().saturating_sub(limit);
        records.into_iter().skip(skip).collect()
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
