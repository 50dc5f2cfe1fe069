// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test fixtures shared across crates (behind the `test-support` feature).
//!
//! The sample library mirrors the on-disk contract: one directory per
//! container, nested to match the id dot-paths, each holding a
//! `container.json`.

use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Write a `container.json` under `dir`, creating the directory.
#[allow(clippy::expect_used)]
pub fn write_container(dir: &Path, def: &Value) {
    fs::create_dir_all(dir).expect("create container dir");
    let body = serde_json::to_string_pretty(def).expect("serialize definition");
    fs::write(dir.join("container.json"), body).expect("write container.json");
}

/// Build the sample Xiaohongshu library under `root`.
///
/// Four roots: home, search, detail, and a risk-control interstitial.
/// The tree exercises every structural rule the loader validates.
#[allow(clippy::expect_used)]
pub fn sample_xiaohongshu_library(root: &Path) {
    let site = root.join("xiaohongshu");

    let home = site.join("xiaohongshu_home");
    write_container(
        &home,
        &json!({
            "id": "xiaohongshu_home",
            "site": "xiaohongshu",
            "root_pattern": "https://www.xiaohongshu.com/*",
            "selectors": [{"css": "#app", "variant": "primary"}],
            "capabilities": ["navigate"],
            "children": [
                "xiaohongshu_home.search_bar",
                "xiaohongshu_home.feed_list",
                "xiaohongshu_home.login_anchor",
                "xiaohongshu_home.login_guard"
            ]
        }),
    );
    write_container(
        &home.join("search_bar"),
        &json!({
            "id": "xiaohongshu_home.search_bar",
            "site": "xiaohongshu",
            "selectors": [
                {"css": "input#search-input", "variant": "primary"},
                {"css": ".search-input input", "variant": "fallback"}
            ],
            "capabilities": ["click", "type"],
            "operations": [
                {"type": "click"},
                {"type": "type"}
            ]
        }),
    );
    write_container(
        &home.join("feed_list"),
        &json!({
            "id": "xiaohongshu_home.feed_list",
            "site": "xiaohongshu",
            "selectors": [{"css": ".feeds-container", "variant": "primary"}],
            "capabilities": ["scroll", "extract"],
            "operations": [
                {"type": "scroll", "config": {"behavior": "smooth"}},
                {"type": "extract", "config": {
                    "fields": {"title": ".title", "author": ".author .name"},
                    "include_text": false
                }}
            ],
            "metadata": {"list_role": "feed"}
        }),
    );
    write_container(
        &home.join("login_anchor"),
        &json!({
            "id": "xiaohongshu_home.login_anchor",
            "site": "xiaohongshu",
            "selectors": [{"css": ".user .avatar", "variant": "primary"}],
            "capabilities": ["extract"]
        }),
    );
    write_container(
        &home.join("login_guard"),
        &json!({
            "id": "xiaohongshu_home.login_guard",
            "site": "xiaohongshu",
            "selectors": [{"css": ".login-container", "variant": "primary"}],
            "capabilities": ["extract"]
        }),
    );

    let search = site.join("xiaohongshu_search");
    write_container(
        &search,
        &json!({
            "id": "xiaohongshu_search",
            "site": "xiaohongshu",
            "root_pattern": "https://www.xiaohongshu.com/search_result*",
            "selectors": [{"css": "#global", "variant": "primary"}],
            "capabilities": ["navigate"],
            "children": [
                "xiaohongshu_search.search_bar",
                "xiaohongshu_search.search_result_list"
            ]
        }),
    );
    write_container(
        &search.join("search_bar"),
        &json!({
            "id": "xiaohongshu_search.search_bar",
            "site": "xiaohongshu",
            "selectors": [{"css": "input#search-input", "variant": "primary"}],
            "capabilities": ["click", "type"],
            "operations": [{"type": "click"}, {"type": "type"}]
        }),
    );
    write_container(
        &search.join("search_result_list"),
        &json!({
            "id": "xiaohongshu_search.search_result_list",
            "site": "xiaohongshu",
            "selectors": [{"css": ".feeds-container", "variant": "primary"}],
            "capabilities": ["scroll", "extract"],
            "operations": [
                {"type": "scroll"},
                {"type": "extract", "config": {
                    "fields": {"title": ".title", "link": "a.cover"},
                    "include_text": false
                }}
            ],
            "children": ["xiaohongshu_search.search_result_list.note_item"],
            "metadata": {"list_role": "results"}
        }),
    );
    write_container(
        &search.join("search_result_list").join("note_item"),
        &json!({
            "id": "xiaohongshu_search.search_result_list.note_item",
            "site": "xiaohongshu",
            "selectors": [{"css": "section.note-item", "variant": "primary"}],
            "capabilities": ["click", "extract"],
            "operations": [
                {"type": "click", "config": {"use_system_mouse": true}},
                {"type": "extract"}
            ],
            "metadata": {"auto_click": false}
        }),
    );

    let detail = site.join("xiaohongshu_detail");
    write_container(
        &detail,
        &json!({
            "id": "xiaohongshu_detail",
            "site": "xiaohongshu",
            "root_pattern": "https://www.xiaohongshu.com/explore/*",
            "selectors": [{"css": "#app", "variant": "primary"}],
            "capabilities": ["navigate"],
            "children": [
                "xiaohongshu_detail.modal_shell",
                "xiaohongshu_detail.content_anchor",
                "xiaohongshu_detail.comment_section"
            ]
        }),
    );
    write_container(
        &detail.join("modal_shell"),
        &json!({
            "id": "xiaohongshu_detail.modal_shell",
            "site": "xiaohongshu",
            "selectors": [{"css": ".note-detail-mask", "variant": "primary"}],
            "capabilities": ["extract", "key"]
        }),
    );
    write_container(
        &detail.join("content_anchor"),
        &json!({
            "id": "xiaohongshu_detail.content_anchor",
            "site": "xiaohongshu",
            "selectors": [{"css": ".note-content", "variant": "primary"}],
            "capabilities": ["extract", "scroll"],
            "operations": [{"type": "extract", "config": {
                "fields": {"title": ".title", "desc": ".desc"},
                "include_text": true
            }}]
        }),
    );
    write_container(
        &detail.join("comment_section"),
        &json!({
            "id": "xiaohongshu_detail.comment_section",
            "site": "xiaohongshu",
            "selectors": [{"css": ".comments-container", "variant": "primary"}],
            "capabilities": ["scroll", "extract"],
            "operations": [{"type": "scroll"}, {"type": "extract"}],
            "children": ["xiaohongshu_detail.comment_section.comment_item"]
        }),
    );
    write_container(
        &detail.join("comment_section").join("comment_item"),
        &json!({
            "id": "xiaohongshu_detail.comment_section.comment_item",
            "site": "xiaohongshu",
            "selectors": [{"css": ".comment-item", "variant": "primary"}],
            "capabilities": ["extract"],
            "operations": [{"type": "extract", "config": {
                "fields": {"author": ".author", "content": ".content"},
                "include_text": false
            }}]
        }),
    );

    let risk = site.join("xiaohongshu_risk");
    write_container(
        &risk,
        &json!({
            "id": "xiaohongshu_risk",
            "site": "xiaohongshu",
            "root_pattern": "*website-login/captcha*",
            "selectors": [{"css": "body", "variant": "primary"}],
            "capabilities": [],
            "children": ["xiaohongshu_risk.risk_control"]
        }),
    );
    write_container(
        &risk.join("risk_control"),
        &json!({
            "id": "xiaohongshu_risk.risk_control",
            "site": "xiaohongshu",
            "selectors": [{"css": ".captcha-container", "variant": "primary"}],
            "capabilities": ["extract"]
        }),
    );
}

/// Minimal second site, proving multi-site indexing.
#[allow(clippy::expect_used)]
pub fn sample_weibo_library(root: &Path) {
    let site = root.join("weibo");

    let home = site.join("weibo_home");
    write_container(
        &home,
        &json!({
            "id": "weibo_home",
            "site": "weibo",
            "root_pattern": "https://weibo.com/*",
            "selectors": [{"css": "#app", "variant": "primary"}],
            "capabilities": ["navigate"],
            "children": ["weibo_home.search_bar", "weibo_home.login_guard"]
        }),
    );
    write_container(
        &home.join("search_bar"),
        &json!({
            "id": "weibo_home.search_bar",
            "site": "weibo",
            "selectors": [{"css": "input[placeholder=\"搜索\"]", "variant": "primary"}],
            "capabilities": ["click", "type"]
        }),
    );
    write_container(
        &home.join("login_guard"),
        &json!({
            "id": "weibo_home.login_guard",
            "site": "weibo",
            "selectors": [{"css": ".login-panel", "variant": "primary"}],
            "capabilities": ["extract"]
        }),
    );
}

/// Proptest strategies for queue/task properties.
#[cfg(any(test, feature = "test-support"))]
pub mod strategies {
    use proptest::prelude::*;

    /// Priorities in the small range workflows actually use.
    pub fn priority() -> impl Strategy<Value = i32> {
        -10..=10i32
    }

    /// Dot-path container ids, one to three segments.
    pub fn container_id() -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-z][a-z0-9_]{1,8}", 1..=3)
            .prop_map(|segments| segments.join("."))
    }
}
