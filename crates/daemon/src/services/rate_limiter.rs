// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limiter service: token buckets for connection admission and
//! outbound bytes, shared by the endpoints that attach the service.

use super::{parse_options, ServiceBuildError};
use crate::component::{Component, ComponentError, ControlContext};
use async_trait::async_trait;
use serde::Deserialize;
use sy_net::{BucketConfig, DenyReason, TokenBucket};

#[derive(Debug, Clone, Deserialize)]
struct BucketOptions {
    burst_size: f64,
    flow_rate: f64,
    #[serde(default)]
    max_grant_size: Option<f64>,
    #[serde(default)]
    max_waiters: Option<usize>,
    #[serde(default)]
    partial_tokens: bool,
    #[serde(default)]
    initial_burst: Option<f64>,
}

impl BucketOptions {
    fn build(&self, name: &str) -> Result<TokenBucket, ServiceBuildError> {
        let config = BucketConfig {
            burst_size: self.burst_size,
            flow_rate: self.flow_rate,
            max_grant_size: self.max_grant_size,
            max_waiters: self.max_waiters,
            partial_tokens: self.partial_tokens,
            initial_burst: self.initial_burst,
        };
        TokenBucket::new(config).map_err(|error| ServiceBuildError::BadOptions {
            name: name.to_string(),
            detail: error.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RateLimiterOptions {
    /// Connection-admission bucket: one token per accepted connection.
    #[serde(default)]
    connections: Option<BucketOptions>,
    /// Outbound-byte bucket: wraps each connection's write side.
    #[serde(default)]
    data: Option<BucketOptions>,
}

/// Traffic-shaping service.
#[derive(Debug)]
pub struct RateLimiterService {
    name: String,
    connections: Option<TokenBucket>,
    data: Option<TokenBucket>,
}

impl RateLimiterService {
    pub fn from_config(
        name: &str,
        options: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ServiceBuildError> {
        let options: RateLimiterOptions = parse_options(name, options)?;
        Ok(Self {
            name: name.to_string(),
            connections: options.connections.map(|o| o.build(name)).transpose()?,
            data: options.data.map(|o| o.build(name)).transpose()?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection_bucket(&self) -> Option<TokenBucket> {
        self.connections.clone()
    }

    pub fn data_bucket(&self) -> Option<TokenBucket> {
        self.data.clone()
    }
}

#[async_trait]
impl Component for RateLimiterService {
    async fn on_stop(
        &self,
        _ctx: &ControlContext,
        _will_reload: bool,
    ) -> Result<(), ComponentError> {
        // Streams still waiting on grants fail fast instead of
        // hanging through shutdown.
        if let Some(bucket) = &self.connections {
            bucket.deny_all_requests(DenyReason::Shutdown);
        }
        if let Some(bucket) = &self.data {
            bucket.deny_all_requests(DenyReason::Shutdown);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
