// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable request facade and routing dispatch info.

use http::{HeaderMap, Method, Uri};
use serde_json::json;
use smol_str::SmolStr;
use std::sync::Arc;
use sy_core::{PathKey, TagLogger};
use thiserror::Error;

/// Errors from request construction; all map to a 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request has no usable host")]
    MissingHost,

    #[error("invalid host header: {0:?}")]
    BadHost(String),

    #[error("invalid request path: {0:?}")]
    BadPath(String),
}

/// The host a request was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub name: String,
    pub port: u16,
}

/// Per-request immutable facade handed to applications.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    id: SmolStr,
    method: Method,
    host: HostInfo,
    path: String,
    search: String,
    headers: Arc<HeaderMap>,
    logger: TagLogger,
}

impl IncomingRequest {
    /// Build from parsed message parts. The host comes from the URI
    /// authority (HTTP/2) or the `host` header (HTTP/1.1);
    /// `default_port` fills in when none is present.
    pub fn new(
        method: Method,
        uri: &Uri,
        headers: HeaderMap,
        default_port: u16,
        logger: &TagLogger,
    ) -> Result<Self, RequestError> {
        let (name, port) = match uri.host() {
            Some(host) => (host.to_string(), uri.port_u16()),
            None => {
                let raw = headers
                    .get(http::header::HOST)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(RequestError::MissingHost)?;
                split_host_port(raw)?
            }
        };

        let path = uri.path().to_string();
        if !path.starts_with('/') {
            return Err(RequestError::BadPath(path));
        }
        let search = uri.query().map(|q| format!("?{q}")).unwrap_or_default();

        let id = SmolStr::new(nanoid::nanoid!(8));
        let logger = logger.sub(format!("req-{id}"));

        Ok(Self {
            id,
            method,
            host: HostInfo {
                name: name.to_ascii_lowercase(),
                port: port.unwrap_or(default_port),
            },
            path,
            search,
            headers: Arc::new(headers),
            logger,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    /// The request path with no query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query string including its leading `?`, or empty.
    pub fn search_string(&self) -> &str {
        &self.search
    }

    /// Path plus query, as it appears in the request log.
    pub fn url(&self) -> String {
        format!("{}{}", self.path, self.search)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn logger(&self) -> &TagLogger {
        &self.logger
    }

    /// Structured summary for log events.
    pub fn info_for_log(&self) -> serde_json::Value {
        json!({
            "id": self.id.as_str(),
            "method": self.method.as_str(),
            "host": format!("{}:{}", self.host.name, self.host.port),
            "url": self.url(),
        })
    }
}

/// Split a `host[:port]` header value, tolerating IPv6 brackets.
fn split_host_port(raw: &str) -> Result<(String, Option<u16>), RequestError> {
    if raw.is_empty() {
        return Err(RequestError::BadHost(raw.to_string()));
    }
    if let Some(rest) = raw.strip_prefix('[') {
        let (name, after) = rest
            .split_once(']')
            .ok_or_else(|| RequestError::BadHost(raw.to_string()))?;
        let port = match after.strip_prefix(':') {
            Some(p) => Some(
                p.parse()
                    .map_err(|_| RequestError::BadHost(raw.to_string()))?,
            ),
            None if after.is_empty() => None,
            None => return Err(RequestError::BadHost(raw.to_string())),
        };
        return Ok((name.to_string(), port));
    }
    match raw.rsplit_once(':') {
        Some((name, port)) => {
            let port = port
                .parse()
                .map_err(|_| RequestError::BadHost(raw.to_string()))?;
            Ok((name.to_string(), Some(port)))
        }
        None => Ok((raw.to_string(), None)),
    }
}

/// How much of a request's path routing has consumed (`base`) and how
/// much remains for the application (`extra`).
///
/// `base` never ends with an empty component except when it represents
/// the root; `extra` may, to denote directory form.
#[derive(Debug, Clone)]
pub struct DispatchInfo {
    base: PathKey,
    extra: PathKey,
    logger: TagLogger,
}

impl DispatchInfo {
    pub fn new(base: PathKey, extra: PathKey, logger: TagLogger) -> Self {
        debug_assert!(
            !base.ends_with_empty() || base.len() == 1,
            "base may only end with an empty component at the root"
        );
        Self { base, extra, logger }
    }

    pub fn base(&self) -> &PathKey {
        &self.base
    }

    pub fn extra(&self) -> &PathKey {
        &self.extra
    }

    pub fn logger(&self) -> &TagLogger {
        &self.logger
    }

    /// The full dispatched path: `base ++ extra`.
    pub fn full_path(&self) -> PathKey {
        self.base.concat(&self.extra)
    }

    /// Component `n` of the full path.
    pub fn full_path_component(&self, n: usize) -> Option<SmolStr> {
        let base_len = self.base.len();
        if n < base_len {
            self.base.components().get(n).cloned()
        } else {
            self.extra.components().get(n - base_len).cloned()
        }
    }

    /// Whether the dispatched path is in directory form (trailing
    /// slash).
    pub fn is_directory(&self) -> bool {
        if self.extra.is_empty() {
            self.base.ends_with_empty()
        } else {
            self.extra.ends_with_empty()
        }
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory()
    }

    /// Relative redirect target that turns this file-form path into
    /// directory form, e.g. `/a/b` → `b/`.
    pub fn redirect_to_directory_string(&self) -> String {
        match self.last_nonempty_component() {
            Some(component) => format!("{component}/"),
            None => "./".to_string(),
        }
    }

    /// Relative redirect target that turns this directory-form path
    /// into file form, e.g. `/a/b/` → `../b`.
    pub fn redirect_to_file_string(&self) -> String {
        match self.last_nonempty_component() {
            Some(component) => format!("../{component}"),
            None => "../".to_string(),
        }
    }

    /// Descend into `extra`: move `consumed` components of `extra`
    /// onto `base`. Used by delegating router applications.
    pub fn descend(&self, consumed: &PathKey, remainder: PathKey) -> DispatchInfo {
        DispatchInfo {
            base: self.base.concat(&consumed.without_wildcard()),
            extra: remainder,
            logger: self.logger.clone(),
        }
    }

    fn last_nonempty_component(&self) -> Option<SmolStr> {
        self.extra
            .components()
            .iter()
            .rev()
            .chain(self.base.components().iter().rev())
            .find(|c| !c.is_empty())
            .cloned()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
