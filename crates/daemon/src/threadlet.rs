// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Threadlet: a single-shot cooperative worker.
//!
//! `start` runs a setup future, then spawns the run future with a
//! [`RunAccess`] for cooperative cancellation. `stop` signals the
//! cancellation token and awaits completion; stop never aborts the
//! task mid-callback. A threadlet is reusable after a completed stop.

use parking_lot::Mutex;
use std::future::Future;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Errors from threadlet operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadletError {
    #[error("threadlet is already running")]
    AlreadyRunning,
}

/// Cancellation surface handed to the run future.
#[derive(Clone)]
pub struct RunAccess {
    token: CancellationToken,
}

impl RunAccess {
    /// Whether a stop has been requested; long loops consult this.
    pub fn should_stop(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when a stop is requested.
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }

    /// Race `future` against the stop signal. `None` means stop won.
    pub async fn race<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.token.cancelled() => None,
            output = future => Some(output),
        }
    }
}

struct RunningThreadlet {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// A start/run/stop worker built on a task plus a cancellation token.
#[derive(Default)]
pub struct Threadlet {
    running: Mutex<Option<RunningThreadlet>>,
}

impl std::fmt::Debug for Threadlet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Threadlet")
            .field("running", &self.is_running())
            .finish()
    }
}

impl Threadlet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Run `start_fn` to completion, then spawn `run_fn`. Fails with
    /// `already-running` if a previous start has not been stopped.
    pub async fn start<S, R, RFut>(
        &self,
        start_fn: S,
        run_fn: R,
    ) -> Result<(), ThreadletError>
    where
        S: Future<Output = ()>,
        R: FnOnce(RunAccess) -> RFut + Send + 'static,
        RFut: Future<Output = ()> + Send + 'static,
    {
        let token = {
            let mut running = self.running.lock();
            if running.is_some() {
                return Err(ThreadletError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            // Reserve the slot before awaiting the start future so a
            // racing start sees already-running.
            *running = Some(RunningThreadlet {
                token: token.clone(),
                handle: tokio::spawn(async {}),
            });
            token
        };

        start_fn.await;

        let access = RunAccess { token: token.clone() };
        let handle = tokio::spawn(run_fn(access));
        if let Some(running) = self.running.lock().as_mut() {
            running.handle = handle;
        }
        Ok(())
    }

    /// Signal cancellation and await the run future's completion. A
    /// stop on an idle threadlet is a no-op.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.token.cancel();
        if running.handle.await.is_err() {
            tracing::warn!("threadlet run task panicked");
        }
    }
}

#[cfg(test)]
#[path = "threadlet_tests.rs"]
mod tests;
