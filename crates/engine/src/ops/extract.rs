// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `extract` operation: structured field extraction relative to the
//! container's matched node.
//!
//! `config.fields` maps output-field names to CSS subselectors evaluated
//! inside each matched node; `include_text` adds the node's own
//! textContent under `"text"`. Matching is scoped: the container's
//! selector is queried inside `scope_ref` (the parent instance's resolved
//! DOM subtree), never globally, so sibling lists elsewhere on the page
//! cannot leak records in. Result: one record per matched node, or a bare
//! record when the caller marks the container singular.

use super::{target_of, Operation, LOCATE_FNS};
use async_trait::async_trait;
use drover_bridge::OperationContext;
use drover_core::{ErrorKind, Fault};
use serde_json::{json, Map, Value};

pub struct ExtractOp;

#[async_trait]
impl Operation for ExtractOp {
    fn id(&self) -> &'static str {
        "extract"
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
        let scope_ref = config.get("scope_ref").and_then(Value::as_str);
        let fields = config
            .get("fields")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        if !fields.is_object() {
            return Err(Fault::new(
                ErrorKind::OperationFailed,
                "extract fields must be an object of name -> subselector",
            ));
        }
        let include_text = config
            .get("include_text")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let singular = config
            .get("singular")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let script = format!(
            "(scopeRef, nodeRef, sel, fields, includeText) => {{ {LOCATE_FNS}
              function targets() {{
                if (nodeRef && !sel) {{
                  const hit = fromPath(nodeRef);
                  return hit ? [hit] : [];
                }}
                const scope = scopeRef ? fromPath(scopeRef) : document;
                if (!scope || !sel) return [];
                return Array.from(scope.querySelectorAll(sel));
              }}
              return targets().map((root) => {{
                const record = {{}};
                for (const [name, sub] of Object.entries(fields)) {{
                  const el = root.querySelector(sub);
                  record[name] = el ? el.textContent.trim() : null;
                }}
                if (includeText) record.text = root.textContent.trim();
                return record;
              }});
            }}"
        );

        let result = ctx
            .page()
            .evaluate(
                &script,
                json!([scope_ref, target.node_ref, target.selector, fields, include_text]),
            )
            .await
            .map_err(super::builtin::fault)?;

        let Some(records) = result.as_array() else {
            return Err(Fault::new(
                ErrorKind::OperationFailed,
                "extract expected an array of records from the page",
            ));
        };
        // Singular containers yield a bare record, not a one-element list.
        if singular && records.len() == 1 {
            return Ok(records[0].clone());
        }
        Ok(result)
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
