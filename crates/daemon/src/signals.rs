// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-level reload/shutdown callback registry and signal wiring.
//!
//! `SIGHUP` requests an in-process reload; `SIGINT` and `SIGTERM`
//! request graceful shutdown. The registry is an ordinary value passed
//! by reference into the system root; nothing here is process-global.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Reload/shutdown request registry.
#[derive(Debug)]
pub struct ProcessHost {
    reload_tx: watch::Sender<u64>,
    shutdown_tx: watch::Sender<bool>,
}

impl Default for ProcessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessHost {
    pub fn new() -> Self {
        let (reload_tx, _) = watch::channel(0);
        let (shutdown_tx, _) = watch::channel(false);
        Self { reload_tx, shutdown_tx }
    }

    /// Ask the system to rebuild its hierarchy from a re-read config.
    pub fn request_reload(&self) {
        self.reload_tx.send_modify(|n| *n += 1);
    }

    /// Ask the system to shut down gracefully.
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Watch reload requests; the value counts requests so far.
    pub fn reload_requests(&self) -> watch::Receiver<u64> {
        self.reload_tx.subscribe()
    }

    /// Watch for the shutdown request.
    pub fn shutdown_requests(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Route unix signals into this registry until `cancel` fires.
    pub fn install_signal_handlers(
        self: &Arc<Self>,
        cancel: &CancellationToken,
    ) -> std::io::Result<JoinHandle<()>> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangup = signal(SignalKind::hangup())?;
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        let host = Arc::clone(self);
        let cancel = cancel.clone();
        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = hangup.recv() => {
                        tracing::info!("SIGHUP received, requesting reload");
                        host.request_reload();
                    }
                    _ = interrupt.recv() => {
                        tracing::info!("SIGINT received, requesting shutdown");
                        host.request_shutdown();
                    }
                    _ = terminate.recv() => {
                        tracing::info!("SIGTERM received, requesting shutdown");
                        host.request_shutdown();
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
