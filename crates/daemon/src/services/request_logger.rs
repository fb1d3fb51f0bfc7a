// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request-logger service: consumes request-completion events from
//! wranglers and appends one line per request to a log file.
//!
//! Line shape:
//! `<end-timestamp> <origin> <protocol> <method> <url> <status>
//! <contentLength|no-body> <duration> <ok|error-codes>`

use super::{parse_options, ServiceBuildError};
use crate::component::{Component, ComponentError, ControlContext};
use crate::events::{EventSink, EventSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use sy_core::{format_byte_count, format_duration, format_utc_timestamp, TagLogger};
use sy_net::RequestEvent;

#[derive(Debug, Deserialize)]
struct RequestLoggerOptions {
    /// Log file path (created on start, appended to).
    path: String,
    /// Also mirror request/response events into the system log.
    #[serde(default)]
    send_to_system_log: bool,
}

/// Per-request logging service. Wranglers feed it through
/// [`sy_net::wrangler::RequestEventSink`].
pub struct RequestLoggerService {
    name: String,
    path: PathBuf,
    send_to_system_log: bool,
    events: EventSource<RequestEvent>,
    sink: tokio::sync::Mutex<Option<EventSink>>,
    logger: Mutex<TagLogger>,
}

impl std::fmt::Debug for RequestLoggerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLoggerService")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

impl RequestLoggerService {
    pub fn from_config(
        name: &str,
        options: &serde_json::Map<String, serde_json::Value>,
        base_dir: &std::path::Path,
    ) -> Result<Self, ServiceBuildError> {
        let options: RequestLoggerOptions = parse_options(name, options)?;
        Ok(Self {
            name: name.to_string(),
            path: base_dir.join(options.path),
            send_to_system_log: options.send_to_system_log,
            events: EventSource::new(64),
            sink: tokio::sync::Mutex::new(None),
            logger: Mutex::new(TagLogger::detached()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render one completed request as a log line.
    pub fn format_line(event: &RequestEvent) -> String {
        let length = match event.content_length {
            Some(length) => format_byte_count(length),
            None => "no-body".to_string(),
        };
        let codes = if event.error_codes.is_empty() {
            "ok".to_string()
        } else {
            event.error_codes.join(",")
        };
        format!(
            "{} {} {} {} {} {} {} {} {}",
            format_utc_timestamp(event.ended_at),
            event.origin,
            event.protocol,
            event.method,
            event.url,
            event.status,
            length,
            format_duration(event.duration),
            codes,
        )
    }
}

impl sy_net::wrangler::RequestEventSink for RequestLoggerService {
    fn on_request(&self, event: &RequestEvent) {
        if self.send_to_system_log {
            let logger = self.logger.lock().clone();
            logger.emit(
                "request",
                json!({
                    "request": event.request_info,
                    "response": event.response_info,
                }),
            );
        }
        self.events.emit(event.clone());
    }
}

#[async_trait]
impl Component for RequestLoggerService {
    async fn on_init(&self, ctx: &ControlContext) -> Result<(), ComponentError> {
        *self.logger.lock() = ctx.logger().clone();
        Ok(())
    }

    async fn on_start(&self, ctx: &ControlContext) -> Result<(), ComponentError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ComponentError::failed(&self.name, e))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ComponentError::failed(&self.name, e))?;

        let logger = ctx.logger().clone();
        let sink = EventSink::spawn(&self.events, move |event: &RequestEvent| {
            let line = Self::format_line(event);
            if let Err(error) = writeln!(file, "{line}") {
                logger.emit("write-failed", json!({ "error": error.to_string() }));
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
#[path = "request_logger_tests.rs"]
mod tests;
