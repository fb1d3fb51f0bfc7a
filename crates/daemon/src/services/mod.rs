// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service components, selected by `class` in the configuration.
//!
//! - `rate-limiter`: connection gating and outbound byte metering
//! - `request-logger`: one formatted line per completed request
//! - `system-logger`: the process-wide structured log, to a file
//! - `process-info-file`: periodically written process info JSON

mod process_info;
mod rate_limiter;
mod request_logger;
mod system_logger;

pub use process_info::ProcessInfoService;
pub use rate_limiter::RateLimiterService;
pub use request_logger::RequestLoggerService;
pub use system_logger::SystemLoggerService;

use thiserror::Error;

/// Errors from service construction: configuration failures, fatal at
/// startup and logged-and-ignored on reload.
#[derive(Debug, Error)]
pub enum ServiceBuildError {
    #[error("service {name:?}: invalid options: {detail}")]
    BadOptions { name: String, detail: String },
}

/// Deserialize class-specific options with a uniform error shape.
pub(crate) fn parse_options<T: serde::de::DeserializeOwned>(
    name: &str,
    options: &serde_json::Map<String, serde_json::Value>,
) -> Result<T, ServiceBuildError> {
    serde_json::from_value(serde_json::Value::Object(options.clone())).map_err(|error| {
        ServiceBuildError::BadOptions { name: name.to_string(), detail: error.to_string() }
    })
}
