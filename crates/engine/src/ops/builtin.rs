// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The built-in operation set.
//!
//! Every element-targeted operation resolves the live node the matcher
//! bound for this instance (`node_ref`), falling back to the container's
//! CSS selector only when the path has gone stale. Pointer interactions
//! default to OS-level input (`system_input`) rather than DOM events;
//! URL and keyboard paths go through the page surface.

use super::{target_of, Operation, OperationRegistry, Target, LOCATE_FNS};
use crate::ops::ExtractOp;
use async_trait::async_trait;
use drover_bridge::OperationContext;
use drover_core::{ErrorKind, Fault};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub(crate) fn fault(e: drover_bridge::BridgeError) -> Fault {
    e.into_fault()
}

/// Install every built-in operation, skipping ids already present.
pub fn register_builtin(registry: &OperationRegistry) {
    registry.register_if_absent(Arc::new(HighlightOp));
    registry.register_if_absent(Arc::new(ScrollOp));
    registry.register_if_absent(Arc::new(ClickOp));
    registry.register_if_absent(Arc::new(ExtractOp));
    registry.register_if_absent(Arc::new(FindChildOp));
    registry.register_if_absent(Arc::new(TypeOp));
    registry.register_if_absent(Arc::new(KeyOp));
    registry.register_if_absent(Arc::new(NavigateOp));
    registry.register_if_absent(Arc::new(MouseMoveOp));
    registry.register_if_absent(Arc::new(MouseClickOp));
}

/// Center of the target node, in viewport pixels.
async fn element_center(
    ctx: &OperationContext,
    target: &Target,
) -> Result<(f64, f64), Fault> {
    let script = format!(
        "(nodeRef, sel) => {{ {LOCATE_FNS}
          const el = locate(nodeRef, sel);
          if (!el) return null;
          const r = el.getBoundingClientRect();
          return {{ x: r.x + r.width / 2, y: r.y + r.height / 2 }};
        }}"
    );
    let rect = ctx
        .page()
        .evaluate(&script, json!([target.node_ref, target.selector]))
        .await
        .map_err(fault)?;
    if rect.is_null() {
        return Err(Fault::new(
            ErrorKind::OperationFailed,
            format!("no element for target {}", target.describe()),
        ));
    }
    let x = rect.get("x").and_then(Value::as_f64);
    let y = rect.get("y").and_then(Value::as_f64);
    match (x, y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(Fault::new(ErrorKind::OperationFailed, "malformed element rect")),
    }
}

/// Outline the target node briefly. Debug aid; requires nothing of the
/// container.
pub struct HighlightOp;

#[async_trait]
impl Operation for HighlightOp {
    fn id(&self) -> &'static str {
        "highlight"
    }

    fn required_capabilities(&self) -> &'static [&'static str] {
        &[]
    }

    async fn run(
        &self,
        ctx: &OperationContext,
        config: &Map<String, Value>,
    ) -> Result<Value, Fault> {
        let target = target_of(config)?;
        let color = config.get("color").and_then(Value::as_str).unwrap_or("#ff3355");
        let duration_ms = config
            .get("duration_ms")
            .and_then(Value::as_u64)
            .unwrap_or(1200);
        let script = format!(
            "(nodeRef, sel, color, ms) => {{ {LOCATE_FNS}
              const el = locate(nodeRef, sel);
              if (!el) return {{ highlighted: false }};
              const prev = el.style.outline;
              el.style.outline = '3px solid ' + color;
              setTimeout(() => {{ el.style.outline = prev; }}, ms);
              return {{ highlighted: true }};
            }}"
        );
        ctx.page()
            .evaluate(
                &script,
                json!([target.node_ref, target.selector, color, duration_ms]),
            )
            .await
            .map_err(fault)
    }
}

/// Scroll the target node (or the window when no target is configured).
pub struct ScrollOp;

#[async_trait]
impl Operation for ScrollOp {
    fn id(&self) -> &'static str {
        "scroll"
    }

    fn required_capabilities(&self) -> &'static [&'static str] {
        &["scroll"]
    }

    async fn run(
        &self,
        ctx: &OperationContext,
        config: &Map<String, Value>,
    ) -> Result<Value, Fault> {
        let node_ref = config.get("node_ref").and_then(Value::as_str);
        let selector = config.get("selector").and_then(Value::as_str);
        let dy = config.get("dy").and_then(Value::as_f64).unwrap_or(600.0);
        let behavior = config
            .get("behavior")
            .and_then(Value::as_str)
            .unwrap_or("auto");
        let script = format!(
            "(nodeRef, sel, dy, behavior) => {{ {LOCATE_FNS}
              const wanted = Boolean(nodeRef || sel);
              const target = wanted ? locate(nodeRef, sel) : null;
              if (wanted && !target) return {{ scrolled: false }};
              (target || window).scrollBy({{ top: dy, behavior }});
              return {{ scrolled: true, dy }};
            }}"
        );
        ctx.page()
            .evaluate(&script, json!([node_ref, selector, dy, behavior]))
            .await
            .map_err(fault)
    }
}

/// Click the container's matched node.
///
/// Default path is OS-level mouse input; `{"use_system_mouse": false}`
/// falls back to a DOM click.
pub struct ClickOp;

#[async_trait]
impl Operation for ClickOp {
    fn id(&self) -> &'static str {
        "click"
    }

    fn required_capabilities(&self) -> &'static [&'static str] {
        &["click"]
    }

    async fn run(
        &self,
        ctx: &OperationContext,
        config: &Map<String, Value>,
    ) -> Result<Value, Fault> {
        let target = target_of(config)?;
        let system = config
            .get("use_system_mouse")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        if system {
            let (x, y) = element_center(ctx, &target).await?;
            ctx.system_input().mouse_move(x, y).await.map_err(fault)?;
            ctx.system_input().mouse_click(x, y).await.map_err(fault)?;
            return Ok(json!({ "clicked": true, "method": "system", "x": x, "y": y }));
        }

        let script = format!(
            "(nodeRef, sel) => {{ {LOCATE_FNS}
              const el = locate(nodeRef, sel);
              if (!el) return {{ clicked: false }};
              el.click();
              return {{ clicked: true }};
            }}"
        );
        let result = ctx
            .page()
            .evaluate(&script, json!([target.node_ref, target.selector]))
            .await
            .map_err(fault)?;
        if result.get("clicked").and_then(Value::as_bool) != Some(true) {
            return Err(Fault::new(
                ErrorKind::OperationFailed,
                format!("no element for target {}", target.describe()),
            ));
        }
        Ok(json!({ "clicked": true, "method": "dom" }))
    }
}

/// Count and path child nodes under the matched node.
pub struct FindChildOp;

#[async_trait]
impl Operation for FindChildOp {
    fn id(&self) -> &'static str {
        "find-child"
    }

    fn required_capabilities(&self) -> &'static [&'static str] {
        &["extract"]
    }

    async fn run(
        &self,
        ctx: &OperationContext,
        config: &Map<String, Value>,
    ) -> Result<Value, Fault> {
        let target = target_of(config)?;
        let child = config
            .get("child_selector")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Fault::new(ErrorKind::OperationFailed, "find-child requires child_selector")
            })?;
        let script = format!(
            "(nodeRef, sel, child) => {{ {LOCATE_FNS}
              const root = locate(nodeRef, sel);
              if (!root) return {{ count: 0, refs: [] }};
              const nodes = Array.from(root.querySelectorAll(child));
              return {{ count: nodes.length, refs: nodes.slice(0, 100).map(pathOf) }};
            }}"
        );
        ctx.page()
            .evaluate(&script, json!([target.node_ref, target.selector, child]))
            .await
            .map_err(fault)
    }
}

/// Focus the matched node and type text.
pub struct TypeOp;

#[async_trait]
impl Operation for TypeOp {
    fn id(&self) -> &'static str {
        "type"
    }

    fn required_capabilities(&self) -> &'static [&'static str] {
        &["type"]
    }

    async fn run(
        &self,
        ctx: &OperationContext,
        config: &Map<String, Value>,
    ) -> Result<Value, Fault> {
        let text = config.get("text").and_then(Value::as_str).ok_or_else(|| {
            Fault::new(ErrorKind::OperationFailed, "type requires text")
        })?;
        let node_ref = config.get("node_ref").and_then(Value::as_str);
        let selector = config.get("selector").and_then(Value::as_str);
        if node_ref.is_some() || selector.is_some() {
            let script = format!(
                "(nodeRef, sel) => {{ {LOCATE_FNS}
                  const el = locate(nodeRef, sel);
                  if (!el) return {{ focused: false }};
                  el.focus();
                  return {{ focused: true }};
                }}"
            );
            ctx.page()
                .evaluate(&script, json!([node_ref, selector]))
                .await
                .map_err(fault)?;
        }
        ctx.page().keyboard().type_text(text).await.map_err(fault)?;
        Ok(json!({ "typed": text.chars().count() }))
    }
}

/// Press a single key (Escape, Enter, ...).
pub struct KeyOp;

#[async_trait]
impl Operation for KeyOp {
    fn id(&self) -> &'static str {
        "key"
    }

    fn required_capabilities(&self) -> &'static [&'static str] {
        &["key"]
    }

    async fn run(
        &self,
        ctx: &OperationContext,
        config: &Map<String, Value>,
    ) -> Result<Value, Fault> {
        let key = config.get("key").and_then(Value::as_str).ok_or_else(|| {
            Fault::new(ErrorKind::OperationFailed, "key requires a key name")
        })?;
        ctx.page().keyboard().press(key).await.map_err(fault)?;
        Ok(json!({ "pressed": key }))
    }
}

/// Navigate the page to a URL.
pub struct NavigateOp;

#[async_trait]
impl Operation for NavigateOp {
    fn id(&self) -> &'static str {
        "navigate"
    }

    fn required_capabilities(&self) -> &'static [&'static str] {
        &["navigate"]
    }

    async fn run(
        &self,
        ctx: &OperationContext,
        config: &Map<String, Value>,
    ) -> Result<Value, Fault> {
        let url = config.get("url").and_then(Value::as_str).ok_or_else(|| {
            Fault::new(ErrorKind::OperationFailed, "navigate requires url")
        })?;
        ctx.page().goto(url).await.map_err(fault)?;
        Ok(json!({ "url": url }))
    }
}

/// Move the OS pointer to coordinates or the target node's center.
pub struct MouseMoveOp;

#[async_trait]
impl Operation for MouseMoveOp {
    fn id(&self) -> &'static str {
        "mouseMove"
    }

    fn required_capabilities(&self) -> &'static [&'static str] {
        &[]
    }

    async fn run(
        &self,
        ctx: &OperationContext,
        config: &Map<String, Value>,
    ) -> Result<Value, Fault> {
        let (x, y) = resolve_point(ctx, config).await?;
        ctx.system_input().mouse_move(x, y).await.map_err(fault)?;
        Ok(json!({ "x": x, "y": y }))
    }
}

/// OS-level click at coordinates or the target node's center. Always
/// system input.
pub struct MouseClickOp;

#[async_trait]
impl Operation for MouseClickOp {
    fn id(&self) -> &'static str {
        "mouseClick"
    }

    fn required_capabilities(&self) -> &'static [&'static str] {
        &["click"]
    }

    async fn run(
        &self,
        ctx: &OperationContext,
        config: &Map<String, Value>,
    ) -> Result<Value, Fault> {
        let (x, y) = resolve_point(ctx, config).await?;
        ctx.system_input().mouse_move(x, y).await.map_err(fault)?;
        ctx.system_input().mouse_click(x, y).await.map_err(fault)?;
        Ok(json!({ "clicked": true, "x": x, "y": y }))
    }
}

/// Explicit coordinates win; otherwise the target node's center.
async fn resolve_point(
    ctx: &OperationContext,
    config: &Map<String, Value>,
) -> Result<(f64, f64), Fault> {
    let x = config.get("x").and_then(Value::as_f64);
    let y = config.get("y").and_then(Value::as_f64);
    if let (Some(x), Some(y)) = (x, y) {
        return Ok((x, y));
    }
    let target = target_of(config)?;
    element_center(ctx, &target).await
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
