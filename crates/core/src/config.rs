// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core configuration struct.

use serde::Deserialize;
use std::path::PathBuf;

/// Default cap on how many trailing bytes of the progress log are
/// scanned when replaying recent events.
pub const DEFAULT_EVENT_REPLAY_MAX_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("library_root must not be empty")]
    EmptyLibraryRoot,
    #[error("bridge_url must not be empty")]
    EmptyBridgeUrl,
}

/// The single configuration struct the core accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Root of the on-disk container library
    pub library_root: PathBuf,
    /// WebSocket URL of the browser bridge service
    pub bridge_url: String,
    /// Optional rate-limit permit service endpoint
    #[serde(default)]
    pub permit_url: Option<String>,
    /// Progress event JSONL file; progress logging is disabled when unset
    #[serde(default)]
    pub progress_file: Option<PathBuf>,
    /// Tail-scan cap for progress replay
    #[serde(default = "default_replay_max_bytes")]
    pub event_replay_max_bytes: u64,
    /// Root directory for persisted notes/comments; defaults under the
    /// user home when unset (resolved by the persist block)
    #[serde(default)]
    pub download_root: Option<PathBuf>,
}

fn default_replay_max_bytes() -> u64 {
    DEFAULT_EVENT_REPLAY_MAX_BYTES
}

impl CoreConfig {
    pub fn new(library_root: impl Into<PathBuf>, bridge_url: impl Into<String>) -> Self {
        Self {
            library_root: library_root.into(),
            bridge_url: bridge_url.into(),
            permit_url: None,
            progress_file: None,
            event_replay_max_bytes: DEFAULT_EVENT_REPLAY_MAX_BYTES,
            download_root: None,
        }
    }

    crate::setters! {
        set {
            event_replay_max_bytes: u64,
        }
        option {
            permit_url: String,
            progress_file: PathBuf,
            download_root: PathBuf,
        }
    }

    /// Parse from TOML, validating the required fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(s)?;
        if config.library_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyLibraryRoot);
        }
        if config.bridge_url.is_empty() {
            return Err(ConfigError::EmptyBridgeUrl);
        }
        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
