// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path-router application: delegates to sibling applications by path
//! prefix, refining `base`/`extra` exactly like the endpoint router.

use super::{parse_options, AppBuildError, AppRegistry};
use crate::application::{AppError, Application, HandlerResult};
use crate::request::{DispatchInfo, IncomingRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use sy_core::{PathKey, PathMap};

#[derive(Debug, Deserialize)]
struct PathRouterOptions {
    /// Path pattern → application name.
    paths: HashMap<String, String>,
}

/// Application that re-routes by path prefix one level down.
pub struct PathRouterApp {
    name: String,
    paths: PathMap<String>,
    registry: Arc<AppRegistry>,
}

impl std::fmt::Debug for PathRouterApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathRouterApp")
            .field("name", &self.name)
            .field("paths", &self.paths.len())
            .finish()
    }
}

impl PathRouterApp {
    pub fn from_config(
        name: &str,
        options: &serde_json::Map<String, serde_json::Value>,
        registry: Arc<AppRegistry>,
    ) -> Result<Self, AppBuildError> {
        let options: PathRouterOptions = parse_options(name, options)?;
        let mut paths = PathMap::new();
        for (pattern, target) in &options.paths {
            let key = PathKey::parse_path_pattern(pattern).map_err(|error| {
                AppBuildError::BadPattern {
                    name: name.to_string(),
                    pattern: pattern.clone(),
                    detail: error.to_string(),
                }
            })?;
            paths.add(&key, target.clone()).map_err(|error| AppBuildError::BadPattern {
                name: name.to_string(),
                pattern: pattern.clone(),
                detail: error.to_string(),
            })?;
        }
        Ok(Self { name: name.to_string(), paths, registry })
    }

    /// Names of the applications this router targets, for
    /// whole-config reference validation.
    pub fn target_names(
        options: &serde_json::Map<String, serde_json::Value>,
    ) -> Vec<String> {
        options
            .get("paths")
            .and_then(|v| v.as_object())
            .map(|paths| {
                paths
                    .values()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Application for PathRouterApp {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_request(
        &self,
        request: &IncomingRequest,
        dispatch: DispatchInfo,
    ) -> Result<HandlerResult, AppError> {
        let query = dispatch.extra().without_wildcard();
        let mut path_match = self.paths.find(&query);
        while let Some(hit) = path_match {
            let target = hit.value().clone();
            let Some(application) = self.registry.get(&target) else {
                return Err(AppError::Internal(format!(
                    "path router {:?} references unknown application {target:?}",
                    self.name
                )));
            };
            let inner = dispatch.descend(hit.key(), hit.key_remainder().clone());
            match application.handle_request(request, inner).await? {
                HandlerResult::Handled(response) => {
                    return Ok(HandlerResult::Handled(response));
                }
                HandlerResult::NotHandled => path_match = hit.next(),
            }
        }
        Ok(HandlerResult::NotHandled)
    }
}

#[cfg(test)]
#[path = "path_router_tests.rs"]
mod tests;
