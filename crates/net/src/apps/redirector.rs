// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redirector application: sends the dispatched remainder to a
//! configured target prefix.

use super::{parse_options, AppBuildError};
use crate::application::{AppError, Application, HandlerResult};
use crate::request::{DispatchInfo, IncomingRequest};
use crate::response;
use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;

fn default_status() -> u16 {
    308
}

#[derive(Debug, Deserialize)]
struct RedirectorOptions {
    /// Absolute URL prefix ending in `/`; `extra` is appended.
    target: String,
    /// Redirect status code (one of 301, 302, 307, 308).
    #[serde(default = "default_status")]
    status: u16,
}

/// Application that answers every dispatch with a redirect.
#[derive(Debug)]
pub struct RedirectorApp {
    name: String,
    target: String,
    status: StatusCode,
}

impl RedirectorApp {
    pub fn from_config(
        name: &str,
        options: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, AppBuildError> {
        let options: RedirectorOptions = parse_options(name, options)?;
        if !options.target.ends_with('/') {
            return Err(AppBuildError::BadOptions {
                name: name.to_string(),
                detail: format!("target must end with '/': {:?}", options.target),
            });
        }
        let status = match options.status {
            301 | 302 | 307 | 308 => {
                StatusCode::from_u16(options.status).map_err(|_| AppBuildError::BadOptions {
                    name: name.to_string(),
                    detail: format!("bad status {}", options.status),
                })?
            }
            other => {
                return Err(AppBuildError::BadOptions {
                    name: name.to_string(),
                    detail: format!("status must be a redirect code, got {other}"),
                })
            }
        };
        Ok(Self { name: name.to_string(), target: options.target, status })
    }
}

#[async_trait]
impl Application for RedirectorApp {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_request(
        &self,
        request: &IncomingRequest,
        dispatch: DispatchInfo,
    ) -> Result<HandlerResult, AppError> {
        let location = format!(
            "{}{}{}",
            self.target,
            dispatch.extra().path_display_relative(),
            request.search_string(),
        );
        Ok(HandlerResult::Handled(response::redirect(self.status, &location)))
    }
}

#[cfg(test)]
#[path = "redirector_tests.rs"]
mod tests;
