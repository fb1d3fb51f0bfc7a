// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component lifecycle and supervision.
//!
//! A component tree is built from [`ComponentHandle`] nodes, each
//! wrapping an implementation of the [`Component`] hook trait. State
//! moves `new → initialized → running → stopped`. Children start in
//! insertion order before their parent's start hook runs; stop is the
//! strict reverse. A child failing to start unwinds its started
//! siblings in reverse order and propagates the error; errors during
//! stop are logged and never block siblings.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::{Arc, Weak};
use sy_core::{ComponentName, TagLogger};
use thiserror::Error;
use tokio::sync::watch;

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    New,
    Initialized,
    Running,
    Stopped,
}

/// Errors from lifecycle operations.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("component {name:?}: cannot {operation} in state {state:?}")]
    WrongState {
        name: String,
        state: ComponentState,
        operation: &'static str,
    },

    #[error("component {name:?}: duplicate child name {child:?}")]
    DuplicateChild { name: String, child: String },

    #[error("component {name:?}: {source}")]
    Failed {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ComponentError {
    /// Wrap an implementation error for component `name`.
    pub fn failed(
        name: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Failed { name: name.to_string(), source: Box::new(source) }
    }
}

/// Per-component context handed to the lifecycle hooks.
pub struct ControlContext {
    logger: TagLogger,
    node: Weak<Node>,
}

impl ControlContext {
    pub fn logger(&self) -> &TagLogger {
        &self.logger
    }

    /// Register a child under this component. Only meaningful during
    /// `on_init`; children registered later miss the current start
    /// pass.
    pub fn add_child(&self, child: ComponentHandle) -> Result<(), ComponentError> {
        match self.node.upgrade() {
            Some(node) => ComponentHandle { node }.add_child(child),
            None => Ok(()),
        }
    }
}

/// The hooks a component implementation fills in.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// One-time setup; may register children via the context.
    async fn on_init(&self, _ctx: &ControlContext) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Bring the component up. Children are already running.
    async fn on_start(&self, _ctx: &ControlContext) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Take the component down. Children are still running and stop
    /// after this returns. `will_reload` distinguishes reload from
    /// shutdown.
    async fn on_stop(
        &self,
        _ctx: &ControlContext,
        _will_reload: bool,
    ) -> Result<(), ComponentError> {
        Ok(())
    }
}

struct Node {
    name: ComponentName,
    imp: Arc<dyn Component>,
    state: Mutex<ComponentState>,
    children: Mutex<Vec<ComponentHandle>>,
    parent: Mutex<Weak<Node>>,
    logger: Mutex<TagLogger>,
    stopped_tx: watch::Sender<bool>,
}

/// A node in the component tree. Clones share the node.
#[derive(Clone)]
pub struct ComponentHandle {
    node: Arc<Node>,
}

impl std::fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("name", &self.node.name)
            .field("state", &*self.node.state.lock())
            .field("children", &self.node.children.lock().len())
            .finish()
    }
}

impl ComponentHandle {
    pub fn new(name: ComponentName, imp: Arc<dyn Component>) -> Self {
        let (stopped_tx, _) = watch::channel(false);
        Self {
            node: Arc::new(Node {
                name,
                imp,
                state: Mutex::new(ComponentState::New),
                children: Mutex::new(Vec::new()),
                parent: Mutex::new(Weak::new()),
                logger: Mutex::new(TagLogger::detached()),
                stopped_tx,
            }),
        }
    }

    pub fn name(&self) -> &ComponentName {
        &self.node.name
    }

    pub fn state(&self) -> ComponentState {
        *self.node.state.lock()
    }

    pub fn logger(&self) -> TagLogger {
        self.node.logger.lock().clone()
    }

    /// Assign the logger this subtree tags from; normally only called
    /// on a root. Children re-derive theirs (own name appended), so a
    /// tree built before its logger is known picks it up wholesale.
    pub fn set_logger(&self, logger: TagLogger) {
        for child in self.children() {
            child.set_logger(logger.sub(child.node.name.as_str()));
        }
        *self.node.logger.lock() = logger;
    }

    pub fn children(&self) -> Vec<ComponentHandle> {
        self.node.children.lock().clone()
    }

    /// The parent node, while it is alive.
    pub fn parent(&self) -> Option<ComponentHandle> {
        self.node.parent.lock().upgrade().map(|node| ComponentHandle { node })
    }

    /// Append a child. Names must be unique among siblings; the child
    /// inherits this node's logger with its own name tag appended.
    pub fn add_child(&self, child: ComponentHandle) -> Result<(), ComponentError> {
        let mut children = self.node.children.lock();
        if children.iter().any(|c| c.node.name == child.node.name) {
            return Err(ComponentError::DuplicateChild {
                name: self.node.name.to_string(),
                child: child.node.name.to_string(),
            });
        }
        *child.node.parent.lock() = Arc::downgrade(&self.node);
        let child_logger = self.node.logger.lock().sub(child.node.name.as_str());
        *child.node.logger.lock() = child_logger;
        children.push(child);
        Ok(())
    }

    fn context(&self) -> ControlContext {
        ControlContext {
            logger: self.logger(),
            node: Arc::downgrade(&self.node),
        }
    }

    fn wrong_state(&self, operation: &'static str) -> ComponentError {
        ComponentError::WrongState {
            name: self.node.name.to_string(),
            state: self.state(),
            operation,
        }
    }

    /// One-time setup: `new → initialized`.
    pub fn init(&self) -> BoxFuture<'_, Result<(), ComponentError>> {
        Box::pin(async move {
            if self.state() != ComponentState::New {
                return Err(self.wrong_state("init"));
            }
            self.node.imp.on_init(&self.context()).await?;
            *self.node.state.lock() = ComponentState::Initialized;
            Ok(())
        })
    }

    /// Bring the subtree up: init if needed, children in insertion
    /// order, then this component's start hook. `initialized →
    /// running`.
    pub fn start(&self) -> BoxFuture<'_, Result<(), ComponentError>> {
        Box::pin(async move {
            match self.state() {
                ComponentState::New => self.init().await?,
                ComponentState::Initialized => {}
                _ => return Err(self.wrong_state("start")),
            }

            let children = self.children();
            let mut started: Vec<ComponentHandle> = Vec::new();
            for child in children {
                match child.start().await {
                    Ok(()) => started.push(child),
                    Err(error) => {
                        self.unwind(started).await;
                        return Err(error);
                    }
                }
            }

            if let Err(error) = self.node.imp.on_start(&self.context()).await {
                self.unwind(started).await;
                return Err(error);
            }

            *self.node.state.lock() = ComponentState::Running;
            self.logger().emit("started", json!({}));
            Ok(())
        })
    }

    /// Stop children started during a failed start pass, in reverse
    /// order.
    async fn unwind(&self, started: Vec<ComponentHandle>) {
        for child in started.into_iter().rev() {
            child.stop(false).await;
        }
    }

    /// Take the subtree down: this component's stop hook, then
    /// children in reverse insertion order. A stop on a not-running
    /// component is a no-op. Errors are logged, never propagated, so
    /// one failing component cannot block its siblings.
    pub fn stop(&self, will_reload: bool) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.state() != ComponentState::Running {
                tracing::debug!(
                    component = %self.node.name,
                    state = ?self.state(),
                    "stop on non-running component"
                );
                return;
            }

            if let Err(error) = self.node.imp.on_stop(&self.context(), will_reload).await {
                self.logger()
                    .emit("stop-error", json!({ "error": error.to_string() }));
            }

            for child in self.children().into_iter().rev() {
                child.stop(will_reload).await;
            }

            *self.node.state.lock() = ComponentState::Stopped;
            let _ = self.node.stopped_tx.send(true);
            self.logger().emit("stopped", json!({ "will_reload": will_reload }));
        })
    }

    /// Resolves when this component reaches `stopped`.
    pub async fn when_stopped(&self) {
        let mut rx = self.node.stopped_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "component_tests.rs"]
mod tests;
