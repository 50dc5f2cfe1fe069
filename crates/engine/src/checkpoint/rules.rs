// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-platform detection tables.
//!
//! Rows are evaluated in priority order; the first hit wins. Hard rules
//! (risk control, offsite) come before anything DOM-derived.

use drover_core::{Checkpoint, ContainerSnapshot};

/// The detection table for one platform.
#[derive(Debug, Clone)]
pub struct CheckpointRules {
    pub platform: &'static str,
    /// Hosts that count as on-platform
    hosts: &'static [&'static str],
    /// URL fragments that mark a risk-control interstitial
    risk_url_markers: &'static [&'static str],
    /// Root container id of the platform home page
    home_root: &'static str,
}

impl CheckpointRules {
    /// Xiaohongshu table.
    pub fn xiaohongshu() -> Self {
        Self {
            platform: "xiaohongshu",
            hosts: &["www.xiaohongshu.com", "xiaohongshu.com"],
            risk_url_markers: &["website-login/captcha", "web-login/captcha", "/verify"],
            home_root: "xiaohongshu_home",
        }
    }

    /// Weibo table.
    pub fn weibo() -> Self {
        Self {
            platform: "weibo",
            hosts: &["weibo.com", "www.weibo.com", "s.weibo.com", "m.weibo.cn"],
            risk_url_markers: &["security.weibo.com", "/captcha", "/verify"],
            home_root: "weibo_home",
        }
    }

    /// Classify a snapshot. Priority order per the platform contract.
    pub fn detect(&self, snapshot: &ContainerSnapshot) -> Checkpoint {
        let url = snapshot.url.as_str();

        // 1. Risk control: URL marker or dedicated anchors. Hard rule.
        if self.risk_url_markers.iter().any(|marker| url.contains(marker))
            || snapshot.matched_segment("risk_control")
        {
            return Checkpoint::RiskControl;
        }

        // 2. Offsite: host is not the platform's. Hard rule.
        match url_host(url) {
            Some(host) if self.hosts.contains(&host) => {}
            _ => return Checkpoint::Offsite,
        }

        // 3. Login wall: the logged-in anchor is absent AND the guard
        //    region matched. Either signal alone is unreliable.
        if !snapshot.matched_segment("login_anchor") && snapshot.matched_segment("login_guard") {
            return Checkpoint::LoginGuard;
        }

        // 4. Comment region visible.
        if snapshot.matched_segment("comment_section") || snapshot.matched_segment("comment_item")
        {
            return Checkpoint::CommentsReady;
        }

        // 5. Detail modal open.
        if snapshot.matched_segment("modal_shell") && snapshot.matched_segment("content_anchor") {
            return Checkpoint::DetailReady;
        }

        // 6. Search page ready.
        if snapshot.matched_segment("search_bar")
            && snapshot.matched_segment("search_result_list")
        {
            return Checkpoint::SearchReady;
        }

        // 7. Home. The DOM signal overrides the URL here: after a modal
        //    closes the URL may still carry a note id.
        if snapshot.matched(self.home_root) && !snapshot.signals.has_detail_mask {
            return Checkpoint::HomeReady;
        }

        Checkpoint::Unknown
    }
}

fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let host = rest.split(['/', '?', '#']).next()?;
    // Strip credentials and port.
    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
    let host = host.split_once(':').map_or(host, |(h, _)| h);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
