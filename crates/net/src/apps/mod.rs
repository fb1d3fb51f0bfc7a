// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in applications, selected by `class` in the configuration.
//!
//! - `static-files`: serve a directory tree with etags and ranges
//! - `redirector`: redirect onto a configured target prefix
//! - `host-router`: delegate to sibling applications by hostname
//! - `path-router`: delegate to sibling applications by path prefix

mod host_router;
mod path_router;
mod redirector;
mod static_files;

pub use host_router::HostRouterApp;
pub use path_router::PathRouterApp;
pub use redirector::RedirectorApp;
pub use static_files::StaticFilesApp;

use crate::application::Application;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from application construction. These are configuration
/// failures: fatal at startup, logged-and-ignored on reload.
#[derive(Debug, Error)]
pub enum AppBuildError {
    #[error("application {name:?}: invalid options: {detail}")]
    BadOptions { name: String, detail: String },

    #[error("application {name:?}: invalid pattern {pattern:?}: {detail}")]
    BadPattern { name: String, pattern: String, detail: String },

    #[error("application {name:?}: references unknown application {target:?}")]
    UnknownTarget { name: String, target: String },
}

/// Shared name→application registry.
///
/// Router applications resolve their targets through this at dispatch
/// time, which lets mutually-referencing applications be built in any
/// order; reference validity is checked once after the whole set is
/// registered.
#[derive(Default)]
pub struct AppRegistry {
    apps: RwLock<HashMap<String, Arc<dyn Application>>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: String, app: Arc<dyn Application>) {
        self.apps.write().insert(name, app);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Application>> {
        self.apps.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.apps.read().contains_key(name)
    }

    /// Snapshot of the registered applications, for router builds.
    pub fn snapshot(&self) -> HashMap<String, Arc<dyn Application>> {
        self.apps.read().clone()
    }
}

impl std::fmt::Debug for AppRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRegistry")
            .field("apps", &self.apps.read().len())
            .finish()
    }
}


/// Deserialize class-specific options with a uniform error shape.
pub(crate) fn parse_options<T: serde::de::DeserializeOwned>(
    name: &str,
    options: &serde_json::Map<String, serde_json::Value>,
) -> Result<T, AppBuildError> {
    serde_json::from_value(serde_json::Value::Object(options.clone())).map_err(|error| {
        AppBuildError::BadOptions { name: name.to_string(), detail: error.to_string() }
    })
}
