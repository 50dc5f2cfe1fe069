// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide pub/sub with glob topics.
//!
//! Topics are `ns:name` strings. A subscription pattern matches segment by
//! segment (split on `:`): `*` matches any run of characters within a
//! segment, `?` matches one character. Subscribers for an event run in
//! registration order, one at a time (awaited); middlewares observe every
//! event before subscribers.

use drover_core::Event;
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A published event as subscribers see it.
#[derive(Debug, Clone)]
pub struct BusEvent {
    pub topic: String,
    pub payload: Value,
}

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Handler = Arc<dyn Fn(BusEvent) -> BoxFuture + Send + Sync>;

struct Subscription {
    pattern: TopicPattern,
    handler: Handler,
}

/// Compiled topic pattern.
#[derive(Debug, Clone)]
struct TopicPattern {
    segments: Vec<String>,
}

impl TopicPattern {
    fn parse(pattern: &str) -> Self {
        Self { segments: pattern.split(':').map(str::to_string).collect() }
    }

    fn matches(&self, topic: &str) -> bool {
        let topic_segments: Vec<&str> = topic.split(':').collect();
        if topic_segments.len() != self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(&topic_segments)
            .all(|(pattern, segment)| segment_matches(pattern, segment))
    }
}

/// Does a glob pattern match a topic? (Same rules as subscriptions.)
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    TopicPattern::parse(pattern).matches(topic)
}

/// Glob match within one segment: `*` any run, `?` one character.
fn segment_matches(pattern: &str, segment: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = segment.chars().collect();

    // Iterative wildcard match with backtracking over the last `*`.
    let (mut pi, mut si) = (0usize, 0usize);
    let (mut star, mut star_si) = (None::<usize>, 0usize);
    while si < s.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == s[si]) {
            pi += 1;
            si += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_si = si;
            pi += 1;
        } else if let Some(star_pi) = star {
            pi = star_pi + 1;
            star_si += 1;
            si = star_si;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// In-process event bus.
///
/// Constructor variant only; no global instance. The engine owns one and
/// hands out `Arc` clones.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Mutex<Vec<Subscription>>,
    middlewares: Mutex<Vec<Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic pattern. Invocation order is registration order.
    pub fn subscribe<F, Fut>(&self, pattern: &str, handler: F)
    where
        F: Fn(BusEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |event| Box::pin(handler(event)));
        self.subscriptions.lock().push(Subscription {
            pattern: TopicPattern::parse(pattern),
            handler,
        });
    }

    /// Install a middleware observing every event, before subscribers.
    pub fn add_middleware<F, Fut>(&self, handler: F)
    where
        F: Fn(BusEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.middlewares
            .lock()
            .push(Arc::new(move |event| Box::pin(handler(event))));
    }

    /// Publish a typed event.
    pub async fn publish(&self, event: &Event) {
        let payload = serde_json::to_value(event).unwrap_or(Value::Null);
        self.publish_raw(event.topic(), payload).await;
    }

    /// Publish a raw topic + payload.
    pub async fn publish_raw(&self, topic: &str, payload: Value) {
        let event = BusEvent { topic: topic.to_string(), payload };

        let middlewares: Vec<Handler> = self.middlewares.lock().clone();
        for middleware in middlewares {
            middleware(event.clone()).await;
        }

        let handlers: Vec<Handler> = {
            let subscriptions = self.subscriptions.lock();
            subscriptions
                .iter()
                .filter(|s| s.pattern.matches(topic))
                .map(|s| s.handler.clone())
                .collect()
        };
        for handler in handlers {
            handler(event.clone()).await;
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
