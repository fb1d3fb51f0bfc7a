// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restartable hierarchy wrapper.
//!
//! Owns the mutable inner component tree. `prepare_to_restart` runs
//! all fallible construction (re-reading config, validating, building
//! the replacement tree) while the old tree keeps serving; a failure
//! is logged and changes nothing. `restart` then stops the old tree
//! with `will_reload` and starts the staged one. At most one tree is
//! ever running under the wrapper.

use crate::component::{Component, ComponentError, ComponentHandle, ControlContext};
use crate::hierarchy::HierarchyError;
use async_trait::async_trait;
use serde_json::json;
use sy_core::TagLogger;

/// Builds a fresh (unstarted) component tree from current
/// configuration.
pub type HierarchyBuilder =
    Box<dyn Fn() -> Result<ComponentHandle, HierarchyError> + Send + Sync>;

/// Component owning the replaceable inner tree.
pub struct HierarchyWrapper {
    builder: HierarchyBuilder,
    current: tokio::sync::Mutex<Option<ComponentHandle>>,
    logger: TagLogger,
}

impl std::fmt::Debug for HierarchyWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyWrapper").finish_non_exhaustive()
    }
}

impl HierarchyWrapper {
    pub fn new(builder: HierarchyBuilder, logger: TagLogger) -> Self {
        Self { builder, current: tokio::sync::Mutex::new(None), logger }
    }

    /// The running inner tree, if any.
    pub async fn current(&self) -> Option<ComponentHandle> {
        self.current.lock().await.clone()
    }

    /// Build a replacement tree from current configuration. The old
    /// tree keeps serving; a build failure is logged and leaves it
    /// untouched.
    pub fn prepare_to_restart(&self) -> Result<ComponentHandle, HierarchyError> {
        match (self.builder)() {
            Ok(staged) => Ok(staged),
            Err(error) => {
                self.logger
                    .emit("reload-failed", json!({ "error": error.to_string() }));
                Err(error)
            }
        }
    }

    /// Stop the old tree (as a reload), then start `staged`. Never
    /// leaves two trees running.
    pub async fn restart(&self, staged: ComponentHandle) -> Result<(), ComponentError> {
        let mut current = self.current.lock().await;
        if let Some(old) = current.take() {
            old.stop(true).await;
        }
        staged.set_logger(self.logger.clone());
        let result = staged.start().await;
        if let Err(error) = &result {
            self.logger
                .emit("reload-failed", json!({ "error": error.to_string() }));
        }
        *current = Some(staged);
        result
    }
}

#[async_trait]
impl Component for HierarchyWrapper {
    async fn on_start(&self, ctx: &ControlContext) -> Result<(), ComponentError> {
        let staged = (self.builder)().map_err(|error| ComponentError::Failed {
            name: "hierarchy".to_string(),
            source: Box::new(error),
        })?;
        staged.set_logger(ctx.logger().clone());
        staged.start().await?;
        *self.current.lock().await = Some(staged);
        Ok(())
    }

    async fn on_stop(
        &self,
        _ctx: &ControlContext,
        will_reload: bool,
    ) -> Result<(), ComponentError> {
        if let Some(old) = self.current.lock().await.take() {
            old.stop(will_reload).await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "restart_tests.rs"]
mod tests;
