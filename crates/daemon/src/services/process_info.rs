// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-info-file service: periodically writes a JSON snapshot of
//! the process (pid, uptime, memory), records the final disposition
//! on stop, and folds a stale file from a dead process into
//! `earlier_runs` marked abruptly stopped.

use super::{parse_options, ServiceBuildError};
use crate::component::{Component, ComponentError, ControlContext};
use crate::threadlet::Threadlet;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn default_update_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize)]
struct ProcessInfoOptions {
    /// Info file path.
    path: String,
    /// Seconds between periodic rewrites.
    #[serde(default = "default_update_secs")]
    update_secs: u64,
}

/// One run's fixed facts plus what was salvaged from a previous file.
#[derive(Debug, Clone)]
struct RunState {
    started_monotonic: Instant,
    started_at: DateTime<Utc>,
    earlier_runs: Vec<Value>,
}

/// Process-info file writer.
pub struct ProcessInfoService {
    name: String,
    path: PathBuf,
    update_interval: Duration,
    threadlet: Threadlet,
    state: Arc<Mutex<Option<RunState>>>,
}

impl std::fmt::Debug for ProcessInfoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessInfoService")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

impl ProcessInfoService {
    pub fn from_config(
        name: &str,
        options: &serde_json::Map<String, serde_json::Value>,
        base_dir: &Path,
    ) -> Result<Self, ServiceBuildError> {
        let options: ProcessInfoOptions = parse_options(name, options)?;
        Ok(Self {
            name: name.to_string(),
            path: base_dir.join(options.path),
            update_interval: Duration::from_secs(options.update_secs.max(1)),
            threadlet: Threadlet::new(),
            state: Arc::new(Mutex::new(None)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Whether a process with `pid` currently exists.
fn pid_alive(pid: i32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

/// Interpret a pre-existing info file: its own earlier runs are
/// inherited, and the record itself becomes an earlier run. A record
/// with no disposition whose pid is gone is marked abruptly stopped.
fn absorb_existing(path: &Path) -> Vec<Value> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let Ok(mut existing) = serde_json::from_str::<Value>(&text) else {
        return Vec::new();
    };

    let mut earlier: Vec<Value> = existing
        .get_mut("earlier_runs")
        .and_then(|v| v.as_array_mut())
        .map(std::mem::take)
        .unwrap_or_default();

    if let Some(object) = existing.as_object_mut() {
        object.remove("earlier_runs");
        let pid = object.get("pid").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
        if object.get("disposition").is_none() && !pid_alive(pid) {
            object.insert(
                "disposition".to_string(),
                json!({ "abruptly_stopped": true, "noted_at": Utc::now().to_rfc3339() }),
            );
        }
    }
    earlier.push(existing);
    earlier
}

/// Resident-set estimate from `/proc/self/statm`, in bytes.
fn memory_usage() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * 4096)
}

fn render_info(state: &RunState, disposition: Option<Value>) -> Value {
    let mut info = json!({
        "pid": std::process::id(),
        "ppid": std::os::unix::process::parent_id(),
        "started_at": state.started_at.to_rfc3339(),
        "product": {
            "name": "switchyard",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "uptime_secs": state.started_monotonic.elapsed().as_secs(),
        "memory_usage": memory_usage(),
    });
    if let Some(object) = info.as_object_mut() {
        if let Some(disposition) = disposition {
            object.insert("disposition".to_string(), disposition);
        }
        if !state.earlier_runs.is_empty() {
            object.insert(
                "earlier_runs".to_string(),
                Value::Array(state.earlier_runs.clone()),
            );
        }
    }
    info
}

fn write_info(
    path: &Path,
    state: &Arc<Mutex<Option<RunState>>>,
    disposition: Option<Value>,
) -> std::io::Result<()> {
    let snapshot = state.lock().clone();
    let Some(snapshot) = snapshot else {
        return Ok(());
    };
    let info = render_info(&snapshot, disposition);
    let text = serde_json::to_string_pretty(&info).unwrap_or_else(|_| "{}".to_string());
    std::fs::write(path, text + "\n")
}

#[async_trait]
impl Component for ProcessInfoService {
    async fn on_start(&self, ctx: &ControlContext) -> Result<(), ComponentError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ComponentError::failed(&self.name, e))?;
        }

        let earlier_runs = absorb_existing(&self.path);
        *self.state.lock() = Some(RunState {
            started_monotonic: Instant::now(),
            started_at: Utc::now(),
            earlier_runs,
        });
        write_info(&self.path, &self.state, None)
            .map_err(|e| ComponentError::failed(&self.name, e))?;

        let logger = ctx.logger().clone();
        let path = self.path.clone();
        let state = Arc::clone(&self.state);
        let interval = self.update_interval;
        self.threadlet
            .start(async {}, move |access| async move {
                while access.race(tokio::time::sleep(interval)).await.is_some() {
                    if let Err(error) = write_info(&path, &state, None) {
                        logger.emit("write-failed", json!({ "error": error.to_string() }));
                    }
                }
            })
            .await
            .map_err(|e| ComponentError::failed(&self.name, e))?;
        Ok(())
    }

    async fn on_stop(
        &self,
        _ctx: &ControlContext,
        will_reload: bool,
    ) -> Result<(), ComponentError> {
        self.threadlet.stop().await;

        let uptime = self
            .state
            .lock()
            .as_ref()
            .map(|s| s.started_monotonic.elapsed().as_secs())
            .unwrap_or(0);
        let kind = if will_reload { "reloading" } else { "shutdown_requested" };
        let disposition = json!({
            "stopped_at": Utc::now().to_rfc3339(),
            "uptime_secs": uptime,
            kind: true,
        });
        if let Err(error) = write_info(&self.path, &self.state, Some(disposition)) {
            tracing::warn!(%error, "final process-info write failed");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "process_info_tests.rs"]
mod tests;
