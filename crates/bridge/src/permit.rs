// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limit permit contract.
//!
//! Permits gate platform search invocations. The core consumes them but
//! never mints them; the issuing service is external.

use async_trait::async_trait;
use drover_core::{ErrorKind, Fault, ProfileId};
use serde::{Deserialize, Serialize};

/// A token authorising one search call for a keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitPermit {
    pub keyword: String,
    pub session_id: ProfileId,
    pub issued_at: u64,
    pub ttl_ms: u64,
}

impl RateLimitPermit {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.issued_at.saturating_add(self.ttl_ms)
    }
}

/// External permit issuer.
#[async_trait]
pub trait PermitService: Send + Sync {
    async fn acquire(&self, keyword: &str, session: &ProfileId)
        -> Result<RateLimitPermit, Fault>;
}

/// Default service for deployments without a permit endpoint: every
/// request is granted a generous permit immediately.
pub struct NoopPermitService {
    ttl_ms: u64,
}

impl NoopPermitService {
    pub fn new() -> Self {
        Self { ttl_ms: 60_000 }
    }
}

impl Default for NoopPermitService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermitService for NoopPermitService {
    async fn acquire(
        &self,
        keyword: &str,
        session: &ProfileId,
    ) -> Result<RateLimitPermit, Fault> {
        if keyword.is_empty() {
            return Err(Fault::new(ErrorKind::OperationFailed, "empty search keyword"));
        }
        Ok(RateLimitPermit {
            keyword: keyword.to_string(),
            session_id: session.clone(),
            issued_at: 0,
            ttl_ms: self.ttl_ms,
        })
    }
}

#[cfg(test)]
#[path = "permit_tests.rs"]
mod tests;
