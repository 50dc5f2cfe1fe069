// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container matcher: binds definitions to live DOM nodes.
//!
//! A pure translator over the bridge: one selector-count pass per
//! candidate, parent-scoped where a parent instance already resolved.
//! The matcher never retries; transient bridge failures surface as
//! retryable errors for the caller.

use drover_bridge::OperationContext;
use drover_core::{
    ContainerDefinition, ContainerInstance, ContainerSnapshot, DomNode, ErrorKind, InstanceId,
    PageSignals, RootMatch,
};
use drover_library::ContainerLibrary;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Bridge jitter; the caller may retry the whole pass.
    #[error("transient match failure: {0}")]
    Transient(String),

    /// The bridge answered with something the matcher cannot read.
    #[error("invalid match response: {0}")]
    Invalid(String),
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchError::Transient(_) => ErrorKind::MatchTransient,
            MatchError::Invalid(_) => ErrorKind::MatchInvalid,
        }
    }

    fn from_bridge(e: drover_bridge::BridgeError) -> Self {
        use drover_bridge::BridgeError;
        match e {
            BridgeError::Protocol(m) | BridgeError::BadArg(m) => MatchError::Invalid(m),
            other => MatchError::Transient(other.to_string()),
        }
    }
}

/// Count matches for a selector, scoped to a parent DOM path when given,
/// and return stable DOM paths for the first matches.
const COUNT_SCRIPT: &str = r"(sel, parentPath) => {
  function fromPath(path) {
    if (!path) return document;
    let node = document.documentElement;
    for (const part of path.split('/').slice(1)) {
      const m = part.match(/^(.*)\[(\d+)\]$/);
      if (!m) return null;
      const children = Array.from(node.children).filter((c) => c.tagName.toLowerCase() === m[1]);
      node = children[Number(m[2])];
      if (!node) return null;
    }
    return node;
  }
  function pathOf(el) {
    const parts = [];
    let node = el;
    while (node && node.parentElement) {
      const tag = node.tagName.toLowerCase();
      const siblings = Array.from(node.parentElement.children).filter(
        (c) => c.tagName.toLowerCase() === tag
      );
      parts.unshift(tag + '[' + siblings.indexOf(node) + ']');
      node = node.parentElement;
    }
    return 'root/' + parts.join('/');
  }
  const scope = fromPath(parentPath);
  if (!scope) return { count: 0, paths: [] };
  const nodes = Array.from(scope.querySelectorAll(sel));
  return { count: nodes.length, paths: nodes.slice(0, 20).map(pathOf) };
}";

/// Page-level signals collected in the same pass as the match.
const SIGNALS_SCRIPT: &str = r"() => ({
  readyState: document.readyState,
  title: document.title,
})";

/// Shallow DOM skeleton for snapshot consumers.
const DOM_TREE_SCRIPT: &str = r"(maxDepth) => {
  function skeleton(el, path, depth) {
    const tag = el.tagName.toLowerCase();
    const node = { tag, node_ref: path, children: [] };
    if (depth < maxDepth) {
      const counts = {};
      for (const child of el.children) {
        const childTag = child.tagName.toLowerCase();
        const i = counts[childTag] || 0;
        counts[childTag] = i + 1;
        node.children.push(skeleton(child, path + '/' + childTag + '[' + i + ']', depth + 1));
      }
    }
    return node;
  }
  return document.body ? skeleton(document.body, 'root/body[0]', 0) : null;
}";

struct SelectorHit {
    count: usize,
    css: String,
    paths: Vec<String>,
}

/// Binds library candidates to the live DOM for one (profile, url) pair.
pub struct Matcher {
    library: Arc<ContainerLibrary>,
}

impl Matcher {
    pub fn new(library: Arc<ContainerLibrary>) -> Self {
        Self { library }
    }

    /// One full match pass. `root_hint` breaks ties when several roots
    /// match (longest shared id prefix wins; else first declared).
    pub async fn snapshot(
        &self,
        ctx: &OperationContext,
        url: &str,
        root_hint: Option<&str>,
    ) -> Result<ContainerSnapshot, MatchError> {
        let candidates = self.library.containers_for_url(url);

        let mut instances: Vec<ContainerInstance> = Vec::with_capacity(candidates.len());
        let mut index_of: HashMap<String, usize> = HashMap::new();

        for (id, def) in &candidates {
            let parent_scope = def.parent_id().and_then(|parent| {
                index_of
                    .get(parent)
                    .and_then(|&i| instances[i].node_ref.clone())
            });
            let hit = self.first_matching_selector(ctx, def, parent_scope.as_deref()).await?;

            let parent_instance_id = def
                .parent_id()
                .and_then(|parent| index_of.get(parent))
                .map(|&i| instances[i].id);

            let instance = match hit {
                Some(hit) => ContainerInstance {
                    id: InstanceId::new(),
                    definition_id: id.clone(),
                    node_ref: hit.paths.first().cloned(),
                    selector: Some(hit.css),
                    url: url.to_string(),
                    match_count: hit.count,
                    parent_instance_id,
                    children: Vec::new(),
                },
                // Zero-match candidates stay in the snapshot so expected-
                // but-absent regions remain visible downstream.
                None => ContainerInstance {
                    id: InstanceId::new(),
                    definition_id: id.clone(),
                    node_ref: None,
                    selector: None,
                    url: url.to_string(),
                    match_count: 0,
                    parent_instance_id,
                    children: Vec::new(),
                },
            };

            if let Some(parent) = parent_instance_id {
                if let Some(parent_instance) =
                    instances.iter_mut().find(|i| i.id == parent)
                {
                    parent_instance.children.push(instance.id);
                }
            }
            index_of.insert(id.clone(), instances.len());
            instances.push(instance);
        }

        let matched_ids: Vec<String> = instances
            .iter()
            .filter(|i| i.is_matched())
            .map(|i| i.definition_id.clone())
            .collect();

        let root_match = choose_root(&candidates, &instances, root_hint);
        let mut signals = self.page_signals(ctx).await?;
        signals.has_detail_mask = matched_segment(&matched_ids, "modal_shell");
        signals.has_search_input = matched_segment(&matched_ids, "search_bar");
        let dom_tree = self.dom_tree(ctx).await?;

        Ok(ContainerSnapshot {
            url: url.to_string(),
            root_match,
            instances,
            dom_tree,
            matched_ids,
            signals,
        })
    }

    /// Selectors are tried in declared order; the first with matches wins.
    async fn first_matching_selector(
        &self,
        ctx: &OperationContext,
        def: &ContainerDefinition,
        parent_scope: Option<&str>,
    ) -> Result<Option<SelectorHit>, MatchError> {
        for selector in &def.selectors {
            let result = ctx
                .page()
                .evaluate(COUNT_SCRIPT, json!([selector.css, parent_scope]))
                .await
                .map_err(MatchError::from_bridge)?;

            let count = result
                .get("count")
                .and_then(Value::as_u64)
                .ok_or_else(|| MatchError::Invalid("count missing from selector pass".into()))?
                as usize;
            if count == 0 {
                continue;
            }
            let paths = result
                .get("paths")
                .and_then(Value::as_array)
                .map(|paths| {
                    paths
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            return Ok(Some(SelectorHit { count, css: selector.css.clone(), paths }));
        }
        Ok(None)
    }

    async fn page_signals(&self, ctx: &OperationContext) -> Result<PageSignals, MatchError> {
        let value = ctx
            .page()
            .evaluate(SIGNALS_SCRIPT, json!([]))
            .await
            .map_err(MatchError::from_bridge)?;
        Ok(PageSignals {
            has_detail_mask: false,
            has_search_input: false,
            ready_state: value
                .get("readyState")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: value
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn dom_tree(&self, ctx: &OperationContext) -> Result<Option<DomNode>, MatchError> {
        let value = ctx
            .page()
            .evaluate(DOM_TREE_SCRIPT, json!([3]))
            .await
            .map_err(MatchError::from_bridge)?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| MatchError::Invalid(format!("malformed dom tree: {e}")))
    }
}

fn matched_segment(matched_ids: &[String], segment: &str) -> bool {
    matched_ids
        .iter()
        .any(|id| id == segment || id.rsplit_once('.').is_some_and(|(_, last)| last == segment))
}

/// Root choice: among matched roots, the longest id prefix shared with the
/// hint wins; without a hint, the first declared root wins.
fn choose_root(
    candidates: &indexmap::IndexMap<String, Arc<ContainerDefinition>>,
    instances: &[ContainerInstance],
    root_hint: Option<&str>,
) -> Option<RootMatch> {
    let matched_roots: Vec<&ContainerInstance> = instances
        .iter()
        .filter(|i| i.is_matched())
        .filter(|i| {
            candidates
                .get(&i.definition_id)
                .is_some_and(|def| def.is_root())
        })
        .collect();

    let chosen = match root_hint {
        Some(hint) => matched_roots
            .iter()
            .max_by_key(|i| common_prefix_len(&i.definition_id, hint))
            .copied()
            .or_else(|| matched_roots.first().copied()),
        None => matched_roots.first().copied(),
    }?;

    Some(RootMatch {
        container_id: chosen.definition_id.clone(),
        instance_id: chosen.id,
        match_count: chosen.match_count,
    })
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
