// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-storage: the append-only progress event log.
//!
//! One JSONL record per line; best-effort writes (a progress log must
//! never take a run down); bounded tail scans for replay.

mod progress;

pub use progress::{ProgressRecord, ProgressStore, RunMode};
