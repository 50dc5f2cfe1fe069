// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drover_bridge::FakeBridge;
use drover_core::test_support::sample_xiaohongshu_library;
use drover_core::ErrorKind;
use drover_library::ContainerLibrary;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use tempfile::TempDir;

struct PageState {
    url: String,
    dom: HashMap<String, usize>,
}

fn logged_in_home_dom() -> HashMap<String, usize> {
    HashMap::from([
        ("#app".to_string(), 1),
        ("input#search-input".to_string(), 1),
        (".feeds-container".to_string(), 1),
        (".user .avatar".to_string(), 1),
    ])
}

fn detail_dom() -> HashMap<String, usize> {
    let mut dom = logged_in_home_dom();
    dom.insert(".note-detail-mask".to_string(), 1);
    dom.insert(".note-content".to_string(), 1);
    dom
}

/// A fake page whose DOM reverts to the home layer when ESC is pressed.
fn scripted_page(bridge: &FakeBridge, initial: PageState) -> Arc<Mutex<PageState>> {
    let state = Arc::new(Mutex::new(initial));

    let eval_state = state.clone();
    bridge.handle("evaluate", move |params| {
        let script = params
            .get("script")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let state = eval_state.lock();
        if script.contains("location.href") {
            return Ok(json!(state.url));
        }
        if script.contains("readyState") {
            return Ok(json!({"readyState": "complete", "title": "小红书"}));
        }
        if script.contains("skeleton") {
            return Ok(serde_json::Value::Null);
        }
        let selector = params
            .get("args")
            .and_then(|a| a.get(0))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let count = state.dom.get(selector).copied().unwrap_or(0);
        let paths: Vec<String> = (0..count).map(|i| format!("root/body[0]/div[{i}]")).collect();
        Ok(json!({"count": count, "paths": paths}))
    });

    let esc_state = state.clone();
    bridge.handle("keyboard:press", move |params| {
        if params.get("key").and_then(serde_json::Value::as_str) == Some("Escape") {
            // Modal closes; the URL keeps the note id.
            esc_state.lock().dom = logged_in_home_dom();
        }
        Ok(serde_json::Value::Null)
    });

    state
}

struct Fixture {
    _dir: TempDir,
    machine: CheckpointMachine,
    bridge: FakeBridge,
}

fn fixture(initial: PageState) -> Fixture {
    let dir = TempDir::new().unwrap();
    sample_xiaohongshu_library(dir.path());
    let library = Arc::new(ContainerLibrary::new(dir.path()));
    library.load().unwrap();

    let bridge = FakeBridge::new();
    scripted_page(&bridge, initial);

    let matcher = Arc::new(Matcher::new(library));
    let machine = CheckpointMachine::new(CheckpointRules::xiaohongshu(), matcher);
    Fixture { _dir: dir, machine, bridge }
}

fn ctx(bridge: &FakeBridge) -> drover_bridge::OperationContext {
    drover_bridge::OperationContext::new("p-1".into(), Arc::new(bridge.clone()))
}

fn fast(timeout_ms: u64, fallback: bool) -> EnsureOptions {
    EnsureOptions {
        timeout_ms,
        check_interval_ms: 10,
        allow_one_level_up_fallback: fallback,
    }
}

#[tokio::test]
async fn detect_classifies_detail_state() {
    let f = fixture(PageState {
        url: "https://www.xiaohongshu.com/explore/abc".into(),
        dom: detail_dom(),
    });
    let (checkpoint, snapshot) = f.machine.detect(&ctx(&f.bridge)).await.unwrap();
    assert_eq!(checkpoint, Checkpoint::DetailReady);
    assert!(snapshot.signals.has_detail_mask);
}

#[tokio::test]
async fn ensure_succeeds_immediately_when_already_there() {
    let f = fixture(PageState {
        url: "https://www.xiaohongshu.com/".into(),
        dom: logged_in_home_dom(),
    });
    let report = f
        .machine
        .ensure(&ctx(&f.bridge), Checkpoint::HomeReady, fast(500, false))
        .await;

    assert!(report.success);
    assert_eq!(report.reached, Checkpoint::HomeReady);
    assert!(report.attempts.is_empty());
    assert!(report.fault().is_none());
}

#[tokio::test]
async fn esc_recovery_closes_the_modal() {
    let f = fixture(PageState {
        url: "https://www.xiaohongshu.com/explore/abc".into(),
        dom: detail_dom(),
    });
    let report = f
        .machine
        .ensure(&ctx(&f.bridge), Checkpoint::HomeReady, fast(1_000, false))
        .await;

    assert!(report.success);
    assert_eq!(report.reached, Checkpoint::HomeReady);
    assert_eq!(report.attempts, vec![Attempt { action: "esc".into(), ok: true, reason: None }]);
    // Recovery used the keyboard only; no clicks.
    assert!(f.bridge.calls_for("system:mouse_click").is_empty());
    assert_eq!(f.bridge.calls_for("keyboard:press").len(), 1);
}

#[tokio::test]
async fn fallback_reaches_one_level_up() {
    // ESC lands on home, search stays unreachable; fallback accepts home.
    let f = fixture(PageState {
        url: "https://www.xiaohongshu.com/explore/abc".into(),
        dom: detail_dom(),
    });
    let report = f
        .machine
        .ensure(&ctx(&f.bridge), Checkpoint::SearchReady, fast(150, true))
        .await;

    assert!(!report.success);
    assert_eq!(report.reached, Checkpoint::HomeReady);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.attempts[0], Attempt { action: "esc".into(), ok: true, reason: None });
    assert_eq!(report.attempts[1].action, "need_user_action");
    assert!(!report.attempts[1].ok);
    assert_eq!(
        report.attempts[1].reason.as_deref(),
        Some("need to reach search_ready")
    );
    assert_eq!(report.fault().unwrap().kind, ErrorKind::CheckpointFallback);
}

#[tokio::test]
async fn timeout_without_fallback_is_unreachable() {
    let f = fixture(PageState {
        url: "https://www.xiaohongshu.com/".into(),
        dom: logged_in_home_dom(),
    });
    let report = f
        .machine
        .ensure(&ctx(&f.bridge), Checkpoint::SearchReady, fast(60, false))
        .await;

    assert!(!report.success);
    assert_eq!(report.reached, Checkpoint::HomeReady);
    assert_eq!(report.fault().unwrap().kind, ErrorKind::CheckpointUnreachable);
    // Home is not an overlay; ESC must not fire.
    assert!(f.bridge.calls_for("keyboard:press").is_empty());
}

#[tokio::test]
async fn risk_control_short_circuits_with_zero_attempts() {
    let f = fixture(PageState {
        url: "https://www.xiaohongshu.com/website-login/captcha?r=1".into(),
        dom: HashMap::new(),
    });
    let report = f
        .machine
        .ensure(&ctx(&f.bridge), Checkpoint::HomeReady, fast(5_000, true))
        .await;

    assert!(!report.success);
    assert_eq!(report.reached, Checkpoint::RiskControl);
    assert!(report.attempts.is_empty());
    assert_eq!(report.fault().unwrap().kind, ErrorKind::RiskControl);
    assert!(f.bridge.calls_for("keyboard:press").is_empty());
}

#[tokio::test]
async fn offsite_is_terminal_too() {
    let f = fixture(PageState {
        url: "https://example.org/".into(),
        dom: HashMap::new(),
    });
    let report = f
        .machine
        .ensure(&ctx(&f.bridge), Checkpoint::HomeReady, fast(5_000, true))
        .await;

    assert!(!report.success);
    assert_eq!(report.reached, Checkpoint::Offsite);
    assert_eq!(report.fault().unwrap().kind, ErrorKind::Offsite);
}
