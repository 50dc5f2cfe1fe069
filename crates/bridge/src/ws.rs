// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket bridge client.
//!
//! One writer task owns the sink; responses are paired to requests by a
//! generated id through a pending map. A dropped connection fails every
//! in-flight call with `Closed`.

use crate::error::BridgeError;
use crate::transport::Bridge;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<Result<Value, BridgeError>>>>>;

/// WebSocket JSON-RPC client for the browser service.
#[derive(Debug)]
pub struct WsBridge {
    out_tx: mpsc::Sender<Message>,
    pending: Pending,
}

impl WsBridge {
    /// Connect and spawn the reader/writer tasks.
    pub async fn connect(url: &str) -> Result<Self, BridgeError> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| BridgeError::Connect(e.to_string()))?;
        tracing::info!(url, "bridge connected");

        let (mut write, mut read) = stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(64);
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    tracing::warn!(%e, "bridge write failed");
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => dispatch_response(&reader_pending, &text),
                    Ok(Message::Close(frame)) => {
                        tracing::info!(?frame, "bridge received close frame");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(%e, "bridge read error");
                        break;
                    }
                }
            }
            // Fail whatever is still waiting.
            let mut pending = reader_pending.lock();
            for (_, tx) in pending.drain() {
                let _ = tx.send(Err(BridgeError::Closed));
            }
        });

        Ok(Self { out_tx, pending })
    }
}

fn dispatch_response(pending: &Pending, text: &str) {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "bridge sent unparseable frame");
            return;
        }
    };
    let Some(id) = value.get("id").and_then(Value::as_str) else {
        // Unsolicited frame (server-side event); ignored at this layer.
        return;
    };
    let Some(tx) = pending.lock().remove(id) else {
        return;
    };

    let success = value.get("success").and_then(Value::as_bool).unwrap_or(false);
    let result = if success {
        Ok(value.get("result").cloned().unwrap_or(Value::Null))
    } else {
        let message = value
            .get("error")
            .map(|e| {
                e.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string())
            })
            .unwrap_or_else(|| "unspecified remote error".to_string());
        Err(BridgeError::Remote(message))
    };
    let _ = tx.send(result);
}

#[async_trait]
impl Bridge for WsBridge {
    async fn call(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        let frame = json!({ "id": id, "method": method, "params": params });
        let body = serde_json::to_string(&frame)
            .map_err(|e| BridgeError::Protocol(e.to_string()))?;
        if self.out_tx.send(Message::text(body)).await.is_err() {
            self.pending.lock().remove(&id);
            return Err(BridgeError::Closed);
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Closed),
        }
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
