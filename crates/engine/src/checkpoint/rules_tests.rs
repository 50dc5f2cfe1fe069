// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drover_core::{ContainerInstance, InstanceId, PageSignals};
use yare::parameterized;

fn snap(url: &str, matched: &[&str], mask: bool) -> ContainerSnapshot {
    let instances = matched
        .iter()
        .map(|id| ContainerInstance {
            id: InstanceId::new(),
            definition_id: id.to_string(),
            node_ref: Some(format!("root/{id}")),
            selector: None,
            url: url.to_string(),
            match_count: 1,
            parent_instance_id: None,
            children: Vec::new(),
        })
        .collect();
    ContainerSnapshot {
        url: url.to_string(),
        root_match: None,
        instances,
        dom_tree: None,
        matched_ids: matched.iter().map(|s| s.to_string()).collect(),
        signals: PageSignals { has_detail_mask: mask, ..PageSignals::default() },
    }
}

const HOME: &str = "https://www.xiaohongshu.com/";

#[test]
fn risk_control_by_url_marker() {
    let rules = CheckpointRules::xiaohongshu();
    let snapshot = snap(
        "https://www.xiaohongshu.com/website-login/captcha?redirect=x",
        &["xiaohongshu_home"],
        false,
    );
    assert_eq!(rules.detect(&snapshot), Checkpoint::RiskControl);
}

#[test]
fn risk_control_by_anchor_beats_everything() {
    let rules = CheckpointRules::xiaohongshu();
    let snapshot = snap(
        HOME,
        &["xiaohongshu_home", "xiaohongshu_risk.risk_control"],
        false,
    );
    assert_eq!(rules.detect(&snapshot), Checkpoint::RiskControl);
}

#[parameterized(
    other_host = { "https://example.org/page" },
    lookalike = { "https://xiaohongshu.com.evil.net/" },
    no_scheme_host = { "not-a-url" },
)]
fn offsite_when_host_is_foreign(url: &str) {
    let rules = CheckpointRules::xiaohongshu();
    assert_eq!(rules.detect(&snap(url, &[], false)), Checkpoint::Offsite);
}

#[test]
fn login_guard_needs_absent_anchor_and_present_guard() {
    let rules = CheckpointRules::xiaohongshu();

    let guarded = snap(HOME, &["xiaohongshu_home", "xiaohongshu_home.login_guard"], false);
    assert_eq!(rules.detect(&guarded), Checkpoint::LoginGuard);

    // Logged in: anchor present, guard leftover in DOM → not a login wall.
    let logged_in = snap(
        HOME,
        &[
            "xiaohongshu_home",
            "xiaohongshu_home.login_anchor",
            "xiaohongshu_home.login_guard",
        ],
        false,
    );
    assert_ne!(rules.detect(&logged_in), Checkpoint::LoginGuard);
}

#[test]
fn comments_ready_beats_detail() {
    let rules = CheckpointRules::xiaohongshu();
    let snapshot = snap(
        "https://www.xiaohongshu.com/explore/abc",
        &[
            "xiaohongshu_home.login_anchor",
            "xiaohongshu_detail.modal_shell",
            "xiaohongshu_detail.content_anchor",
            "xiaohongshu_detail.comment_section",
        ],
        true,
    );
    assert_eq!(rules.detect(&snapshot), Checkpoint::CommentsReady);
}

#[test]
fn detail_ready_needs_shell_and_content() {
    let rules = CheckpointRules::xiaohongshu();
    let both = snap(
        "https://www.xiaohongshu.com/explore/abc",
        &[
            "xiaohongshu_home.login_anchor",
            "xiaohongshu_detail.modal_shell",
            "xiaohongshu_detail.content_anchor",
        ],
        true,
    );
    assert_eq!(rules.detect(&both), Checkpoint::DetailReady);

    let shell_only = snap(
        "https://www.xiaohongshu.com/explore/abc",
        &["xiaohongshu_home.login_anchor", "xiaohongshu_detail.modal_shell"],
        true,
    );
    assert_ne!(rules.detect(&shell_only), Checkpoint::DetailReady);
}

#[test]
fn search_ready_needs_bar_and_results() {
    let rules = CheckpointRules::xiaohongshu();
    let snapshot = snap(
        "https://www.xiaohongshu.com/search_result?keyword=x",
        &[
            "xiaohongshu_home.login_anchor",
            "xiaohongshu_search.search_bar",
            "xiaohongshu_search.search_result_list",
        ],
        false,
    );
    assert_eq!(rules.detect(&snapshot), Checkpoint::SearchReady);
}

#[test]
fn home_ready_requires_mask_gone() {
    let rules = CheckpointRules::xiaohongshu();

    // URL still carries a note id after modal close; DOM signal decides.
    let url = "https://www.xiaohongshu.com/explore/abc";
    let closed = snap(url, &["xiaohongshu_home", "xiaohongshu_home.login_anchor"], false);
    assert_eq!(rules.detect(&closed), Checkpoint::HomeReady);

    let masked = snap(url, &["xiaohongshu_home", "xiaohongshu_home.login_anchor"], true);
    assert_eq!(rules.detect(&masked), Checkpoint::Unknown);
}

#[test]
fn nothing_matching_is_unknown() {
    let rules = CheckpointRules::xiaohongshu();
    let snapshot = snap(HOME, &["xiaohongshu_home.login_anchor"], false);
    assert_eq!(rules.detect(&snapshot), Checkpoint::Unknown);
}

#[test]
fn weibo_table_uses_its_own_hosts_and_home_root() {
    let rules = CheckpointRules::weibo();

    let home = snap(
        "https://weibo.com/",
        &["weibo_home", "weibo_home.login_anchor"],
        false,
    );
    assert_eq!(rules.detect(&home), Checkpoint::HomeReady);

    let elsewhere = snap(HOME, &["weibo_home"], false);
    assert_eq!(rules.detect(&elsewhere), Checkpoint::Offsite);
}
