// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host + path routing for one endpoint.
//!
//! A two-level longest-prefix match: hostname (wildcards on the left)
//! to path prefix to application. Dispatch walks path matches from
//! most to least specific until an application reports `Handled`.

use crate::application::{AppError, Application, HandlerResult};
use crate::request::{DispatchInfo, IncomingRequest};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;
use sy_config::MountConfig;
use sy_core::{PathKey, PathMap, TagLogger};
use thiserror::Error;

/// Errors from router construction.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("mount references unknown application {0:?}")]
    UnknownApplication(String),

    #[error("invalid mount pattern {pattern:?}: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: sy_core::PathKeyError,
    },

    #[error("duplicate mount for hostname {hostname:?} path {path:?}")]
    DuplicateMount { hostname: String, path: String },
}

/// The endpoint's two-level dispatch table.
pub struct EndpointRouter {
    mounts: PathMap<PathMap<Arc<dyn Application>>>,
    logger: TagLogger,
}

impl std::fmt::Debug for EndpointRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointRouter")
            .field("hostnames", &self.mounts.len())
            .finish()
    }
}

impl EndpointRouter {
    /// Build the mount map from endpoint config and the application
    /// registry.
    pub fn new(
        mounts: &[MountConfig],
        applications: &HashMap<String, Arc<dyn Application>>,
        logger: TagLogger,
    ) -> Result<Self, RouterError> {
        // Group by hostname first; the outer trie is built once per
        // distinct hostname pattern.
        let mut by_host: Vec<(PathKey, PathMap<Arc<dyn Application>>)> = Vec::new();
        for mount in mounts {
            let application = applications
                .get(&mount.application)
                .cloned()
                .ok_or_else(|| RouterError::UnknownApplication(mount.application.clone()))?;
            let host_key =
                PathKey::parse_hostname(&mount.hostname, true).map_err(|source| {
                    RouterError::BadPattern { pattern: mount.hostname.clone(), source }
                })?;
            let path_key = PathKey::parse_path_pattern(&mount.path).map_err(|source| {
                RouterError::BadPattern { pattern: mount.path.clone(), source }
            })?;

            let index = match by_host.iter().position(|(key, _)| *key == host_key) {
                Some(index) => index,
                None => {
                    by_host.push((host_key.clone(), PathMap::new()));
                    by_host.len() - 1
                }
            };
            by_host[index].1.add(&path_key, application).map_err(|_| {
                RouterError::DuplicateMount {
                    hostname: mount.hostname.clone(),
                    path: mount.path.clone(),
                }
            })?;
        }

        let mut outer = PathMap::new();
        for (host_key, paths) in by_host {
            outer
                .add(&host_key, paths)
                .map_err(|_| RouterError::DuplicateMount {
                    hostname: host_key.hostname_display(),
                    path: "(any)".to_string(),
                })?;
        }

        Ok(Self { mounts: outer, logger })
    }

    /// Route one request to the most-specific willing application.
    pub async fn dispatch(
        &self,
        request: &IncomingRequest,
    ) -> Result<HandlerResult, AppError> {
        let Ok(host_key) = PathKey::parse_hostname(&request.host().name, false) else {
            self.logger.emit(
                "host-not-found",
                serde_json::json!({ "host": request.host().name }),
            );
            return Ok(HandlerResult::NotHandled);
        };
        let Ok(path_key) = PathKey::parse_path(request.path()) else {
            return Ok(HandlerResult::NotHandled);
        };

        let Some(host_match) = self.mounts.find(&host_key) else {
            self.logger.emit(
                "host-not-found",
                serde_json::json!({ "host": request.host().name }),
            );
            return Ok(HandlerResult::NotHandled);
        };

        let mut path_match = host_match.value().find(&path_key);
        while let Some(hit) = path_match {
            let application = Arc::clone(hit.value());
            let (base, extra) = split_dispatch(hit.key(), hit.key_remainder());
            let dispatch = DispatchInfo::new(
                base,
                extra,
                request.logger().sub(application.name().to_string()),
            );
            match application.handle_request(request, dispatch).await? {
                HandlerResult::Handled(response) => {
                    return Ok(HandlerResult::Handled(response));
                }
                HandlerResult::NotHandled => {
                    path_match = hit.next();
                }
            }
        }

        self.logger.emit(
            "path-not-found",
            serde_json::json!({ "host": request.host().name, "path": request.path() }),
        );
        Ok(HandlerResult::NotHandled)
    }
}

/// Base/extra for a path match, normalized so base never ends with an
/// empty component (directory-form mounts push the empty component
/// into `extra`).
fn split_dispatch(key: &PathKey, remainder: &PathKey) -> (PathKey, PathKey) {
    let base = key.without_wildcard();
    let extra = remainder.clone();
    if base.ends_with_empty() && base.len() > 1 {
        let trimmed = PathKey::new(
            base.components()[..base.len() - 1].to_vec(),
            false,
        );
        let mut extra_components = vec![SmolStr::new("")];
        extra_components.extend(extra.components().iter().cloned());
        return (trimmed, PathKey::new(extra_components, false));
    }
    (base, extra)
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
