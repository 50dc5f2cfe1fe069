// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn from_toml_with_defaults() {
    let config = CoreConfig::from_toml_str(
        r#"
        library_root = "/srv/container-library"
        bridge_url = "ws://127.0.0.1:8900"
        "#,
    )
    .unwrap();

    assert_eq!(config.library_root, PathBuf::from("/srv/container-library"));
    assert_eq!(config.event_replay_max_bytes, DEFAULT_EVENT_REPLAY_MAX_BYTES);
    assert!(config.permit_url.is_none());
    assert!(config.progress_file.is_none());
}

#[test]
fn from_toml_full() {
    let config = CoreConfig::from_toml_str(
        r#"
        library_root = "/lib"
        bridge_url = "ws://bridge:9"
        permit_url = "http://permits:8080"
        progress_file = "/var/log/drover/progress.jsonl"
        event_replay_max_bytes = 1024
        download_root = "/data/download"
        "#,
    )
    .unwrap();

    assert_eq!(config.permit_url.as_deref(), Some("http://permits:8080"));
    assert_eq!(config.event_replay_max_bytes, 1024);
    assert_eq!(config.download_root, Some(PathBuf::from("/data/download")));
}

#[test]
fn empty_library_root_rejected() {
    let err = CoreConfig::from_toml_str(
        r#"
        library_root = ""
        bridge_url = "ws://x"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::EmptyLibraryRoot));
}

#[test]
fn empty_bridge_url_rejected() {
    let err = CoreConfig::from_toml_str(
        r#"
        library_root = "/lib"
        bridge_url = ""
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::EmptyBridgeUrl));
}

#[test]
fn setters_compose() {
    let config = CoreConfig::new("/lib", "ws://bridge")
        .permit_url("http://permits")
        .event_replay_max_bytes(64);
    assert_eq!(config.permit_url.as_deref(), Some("http://permits"));
    assert_eq!(config.event_replay_max_bytes, 64);
}
