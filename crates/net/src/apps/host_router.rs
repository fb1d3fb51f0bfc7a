// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-router application: delegates to sibling applications by
//! hostname, leaving the path dispatch untouched.

use super::{parse_options, AppBuildError, AppRegistry};
use crate::application::{AppError, Application, HandlerResult};
use crate::request::{DispatchInfo, IncomingRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use sy_core::{PathKey, PathMap};

#[derive(Debug, Deserialize)]
struct HostRouterOptions {
    /// Hostname pattern → application name.
    hosts: HashMap<String, String>,
}

/// Application that re-routes by hostname one level down.
pub struct HostRouterApp {
    name: String,
    hosts: PathMap<String>,
    registry: Arc<AppRegistry>,
}

impl std::fmt::Debug for HostRouterApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRouterApp")
            .field("name", &self.name)
            .field("hosts", &self.hosts.len())
            .finish()
    }
}

impl HostRouterApp {
    pub fn from_config(
        name: &str,
        options: &serde_json::Map<String, serde_json::Value>,
        registry: Arc<AppRegistry>,
    ) -> Result<Self, AppBuildError> {
        let options: HostRouterOptions = parse_options(name, options)?;
        let mut hosts = PathMap::new();
        for (pattern, target) in &options.hosts {
            let key = PathKey::parse_hostname(pattern, true).map_err(|error| {
                AppBuildError::BadPattern {
                    name: name.to_string(),
                    pattern: pattern.clone(),
                    detail: error.to_string(),
                }
            })?;
            hosts.add(&key, target.clone()).map_err(|error| AppBuildError::BadPattern {
                name: name.to_string(),
                pattern: pattern.clone(),
                detail: error.to_string(),
            })?;
        }
        Ok(Self { name: name.to_string(), hosts, registry })
    }

    /// Names of the applications this router targets, for
    /// whole-config reference validation.
    pub fn target_names(
        options: &serde_json::Map<String, serde_json::Value>,
    ) -> Vec<String> {
        options
            .get("hosts")
            .and_then(|v| v.as_object())
            .map(|hosts| {
                hosts
                    .values()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Application for HostRouterApp {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_request(
        &self,
        request: &IncomingRequest,
        dispatch: DispatchInfo,
    ) -> Result<HandlerResult, AppError> {
        let Ok(host_key) = PathKey::parse_hostname(&request.host().name, false) else {
            return Ok(HandlerResult::NotHandled);
        };
        let mut host_match = self.hosts.find(&host_key);
        while let Some(hit) = host_match {
            let target = hit.value().clone();
            let Some(application) = self.registry.get(&target) else {
                return Err(AppError::Internal(format!(
                    "host router {:?} references unknown application {target:?}",
                    self.name
                )));
            };
            match application.handle_request(request, dispatch.clone()).await? {
                HandlerResult::Handled(response) => {
                    return Ok(HandlerResult::Handled(response));
                }
                HandlerResult::NotHandled => host_match = hit.next(),
            }
        }
        Ok(HandlerResult::NotHandled)
    }
}

#[cfg(test)]
#[path = "host_router_tests.rs"]
mod tests;
