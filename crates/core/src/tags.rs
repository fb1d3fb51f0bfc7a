// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tag-based structured logger facade.
//!
//! A [`TagLogger`] is a cheap value: a tag path plus an optional sink
//! handle. `sub` appends a tag; `emit` records a structured event.
//! Every emission goes to `tracing`; when a sink is attached (the
//! daemon wires the process-wide event chain here), the full record is
//! pushed into it as well, which is what the system-logger and
//! request-logger services consume.

use serde::Serialize;
use smol_str::SmolStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// One structured log emission.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// Wall-clock milliseconds since the epoch.
    pub at_ms: u64,
    /// Tag path from the root logger down.
    pub tags: Vec<SmolStr>,
    /// Event kind, e.g. `started`, `request`, `reload-failed`.
    pub kind: SmolStr,
    /// Structured payload.
    pub payload: serde_json::Value,
}

impl LogRecord {
    /// Dotted tag path, e.g. `endpoint.main.conn-12`.
    pub fn tag_path(&self) -> String {
        self.tags.join(".")
    }
}

/// Receiver for emitted log records.
pub trait LogSink: Send + Sync {
    fn record(&self, record: LogRecord);
}

/// A value-typed structured logger carrying a tag path.
#[derive(Clone, Default)]
pub struct TagLogger {
    tags: Vec<SmolStr>,
    sink: Option<Arc<dyn LogSink>>,
}

impl std::fmt::Debug for TagLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagLogger")
            .field("tags", &self.tags)
            .field("sink", &self.sink.as_ref().map(|_| "..."))
            .finish()
    }
}

impl TagLogger {
    /// Root logger feeding `sink`.
    pub fn root(sink: Arc<dyn LogSink>) -> Self {
        Self { tags: Vec::new(), sink: Some(sink) }
    }

    /// Logger with no sink; emissions go to `tracing` only.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn tags(&self) -> &[SmolStr] {
        &self.tags
    }

    /// Child logger with `tag` appended to the tag path.
    pub fn sub(&self, tag: impl Into<SmolStr>) -> TagLogger {
        let mut tags = self.tags.clone();
        tags.push(tag.into());
        TagLogger { tags, sink: self.sink.clone() }
    }

    /// Emit a structured event under this logger's tag path.
    pub fn emit(&self, kind: impl Into<SmolStr>, payload: serde_json::Value) {
        let record = LogRecord {
            at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            tags: self.tags.clone(),
            kind: kind.into(),
            payload,
        };
        tracing::debug!(
            target: "sy::log",
            tags = %record.tag_path(),
            kind = %record.kind,
            payload = %record.payload,
        );
        if let Some(sink) = &self.sink {
            sink.record(record);
        }
    }
}

#[cfg(test)]
#[path = "tags_tests.rs"]
mod tests;
