// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The system root: one per process.
//!
//! Owns a keep-running ticker (so the runtime stays alive while all
//! endpoints are idle), the restartable hierarchy wrapper, and the
//! signal registrations. The run loop races reload requests against
//! the stop request: reload rebuilds from re-read configuration (a
//! failure leaves the old tree serving), stop tears everything down
//! and unregisters the signal handlers.

use crate::component::{
    Component, ComponentError, ComponentHandle, ControlContext,
};
use crate::restart::{HierarchyBuilder, HierarchyWrapper};
use crate::signals::ProcessHost;
use crate::threadlet::Threadlet;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use sy_core::{ComponentName, TagLogger};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors escaping [`SystemRoot::run`]; all mean a failed start.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error("cannot install signal handlers: {0}")]
    Signals(#[from] std::io::Error),

    #[error("invalid system component name: {0}")]
    BadName(String),
}

/// Ticker that keeps the process alive while everything is idle.
struct KeepRunning {
    threadlet: Threadlet,
}

#[async_trait]
impl Component for KeepRunning {
    async fn on_start(&self, _ctx: &ControlContext) -> Result<(), ComponentError> {
        self.threadlet
            .start(async {}, |access| async move {
                // One wakeup an hour; the point is the live task, not
                // the tick.
                while access
                    .race(tokio::time::sleep(Duration::from_secs(3600)))
                    .await
                    .is_some()
                {}
            })
            .await
            .map_err(|e| ComponentError::failed("keep-running", e))
    }

    async fn on_stop(
        &self,
        _ctx: &ControlContext,
        _will_reload: bool,
    ) -> Result<(), ComponentError> {
        self.threadlet.stop().await;
        Ok(())
    }
}

/// The root of the whole process.
pub struct SystemRoot {
    root: ComponentHandle,
    wrapper: Arc<HierarchyWrapper>,
    host: Arc<ProcessHost>,
    logger: TagLogger,
}

impl std::fmt::Debug for SystemRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRoot").field("root", &self.root).finish()
    }
}

impl SystemRoot {
    /// Assemble the root tree: `system` → (`keep-running`,
    /// `hierarchy`).
    pub fn new(
        builder: HierarchyBuilder,
        host: Arc<ProcessHost>,
        logger: TagLogger,
    ) -> Result<Self, SystemError> {
        let name = |n: &str| {
            ComponentName::new(n).map_err(|_| SystemError::BadName(n.to_string()))
        };

        let root = ComponentHandle::new(name("system")?, Arc::new(SystemShell));
        root.set_logger(logger.clone());

        root.add_child(ComponentHandle::new(
            name("keep-running")?,
            Arc::new(KeepRunning { threadlet: Threadlet::new() }),
        ))?;

        let wrapper = Arc::new(HierarchyWrapper::new(builder, logger.sub("hierarchy")));
        root.add_child(ComponentHandle::new(name("hierarchy")?, Arc::clone(&wrapper) as Arc<dyn Component>))?;

        Ok(Self { root, wrapper, host, logger })
    }

    /// The root component, mostly for inspection in tests.
    pub fn root(&self) -> &ComponentHandle {
        &self.root
    }

    /// Start everything, serve until shutdown is requested, reloading
    /// on request along the way, then stop everything. Initial start
    /// errors propagate; reload errors are logged and swallowed.
    pub async fn run(&self) -> Result<(), SystemError> {
        let cancel = CancellationToken::new();
        let signal_task = self.host.install_signal_handlers(&cancel)?;

        if let Err(error) = self.root.start().await {
            cancel.cancel();
            let _ = signal_task.await;
            return Err(error.into());
        }
        self.logger.emit("running", json!({}));

        let mut reload_rx = self.host.reload_requests();
        let mut shutdown_rx = self.host.shutdown_requests();
        reload_rx.borrow_and_update();

        loop {
            tokio::select! {
                changed = reload_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    reload_rx.borrow_and_update();
                    self.reload().await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow_and_update() {
                        break;
                    }
                }
            }
        }

        self.logger.emit("shutdown", json!({}));
        self.root.stop(false).await;
        cancel.cancel();
        let _ = signal_task.await;
        Ok(())
    }

    /// One reload pass: build the replacement while the old tree
    /// serves; only a successful build swaps trees.
    async fn reload(&self) {
        self.logger.emit("reload-requested", json!({}));
        match self.wrapper.prepare_to_restart() {
            Ok(staged) => {
                if self.wrapper.restart(staged).await.is_ok() {
                    self.logger.emit("reload-complete", json!({}));
                }
            }
            Err(_) => {
                // Already logged as reload-failed by the wrapper; the
                // old hierarchy keeps serving.
            }
        }
    }
}

/// Root node implementation; the children do the work.
struct SystemShell;

#[async_trait]
impl Component for SystemShell {}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
