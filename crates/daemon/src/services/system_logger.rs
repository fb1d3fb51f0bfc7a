// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System-logger service: consumes the process-wide tag-logger event
//! chain and appends human-readable lines to a file.

use super::{parse_options, ServiceBuildError};
use crate::component::{Component, ComponentError, ControlContext};
use crate::events::{EventSink, EventSource};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;
use sy_core::{format_utc_timestamp, LogRecord};

#[derive(Debug, Deserialize)]
struct SystemLoggerOptions {
    /// Log file path (created on start, appended to).
    path: String,
}

/// Structured-log-to-file service.
pub struct SystemLoggerService {
    name: String,
    path: PathBuf,
    records: EventSource<LogRecord>,
    sink: tokio::sync::Mutex<Option<EventSink>>,
}

impl std::fmt::Debug for SystemLoggerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemLoggerService")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

impl SystemLoggerService {
    pub fn from_config(
        name: &str,
        options: &serde_json::Map<String, serde_json::Value>,
        base_dir: &std::path::Path,
        records: EventSource<LogRecord>,
    ) -> Result<Self, ServiceBuildError> {
        let options: SystemLoggerOptions = parse_options(name, options)?;
        Ok(Self {
            name: name.to_string(),
            path: base_dir.join(options.path),
            records,
            sink: tokio::sync::Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render one structured record as a log line.
    pub fn format_line(record: &LogRecord) -> String {
        let at = Utc
            .timestamp_millis_opt(record.at_ms as i64)
            .single()
            .unwrap_or_default();
        let tags = if record.tags.is_empty() {
            "-".to_string()
        } else {
            record.tag_path()
        };
        format!(
            "{} {} {} {}",
            format_utc_timestamp(at),
            tags,
            record.kind,
            record.payload,
        )
    }
}

#[async_trait]
impl Component for SystemLoggerService {
    async fn on_start(&self, _ctx: &ControlContext) -> Result<(), ComponentError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ComponentError::failed(&self.name, e))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ComponentError::failed(&self.name, e))?;

        let sink = EventSink::spawn(&self.records, move |record: &LogRecord| {
            let line = Self::format_line(record);
            if let Err(error) = writeln!(file, "{line}") {
                tracing::warn!(%error, "system log write failed");
            }
        });
        *self.sink.lock().await = Some(sink);
        Ok(())
    }

    async fn on_stop(
        &self,
        _ctx: &ControlContext,
        _will_reload: bool,
    ) -> Result<(), ComponentError> {
        if let Some(sink) = self.sink.lock().await.take() {
            sink.drain_and_stop().await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "system_logger_tests.rs"]
mod tests;
