// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static-file application: serves a directory tree with etags,
//! conditional GETs, byte ranges, and directory redirects.

use super::{parse_options, AppBuildError};
use crate::application::{AppError, Application, HandlerResult};
use crate::etag::{self, EtagConfig};
use crate::request::{DispatchInfo, IncomingRequest};
use crate::response::{self, RangeOutcome};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ETAG, IF_NONE_MATCH};
use http::{Method, StatusCode};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Memoized etags are keyed by path and validated against file
/// metadata; the map drops its oldest entry at capacity.
const ETAG_CACHE_CAPACITY: usize = 1024;

fn default_index_file() -> String {
    "index.html".to_string()
}

#[derive(Debug, Deserialize)]
struct StaticFilesOptions {
    /// Root of the served tree.
    site_directory: String,
    /// File served (with status 404) when nothing matches, relative
    /// to the site directory.
    #[serde(default)]
    not_found_path: Option<String>,
    /// File served for directory-form paths.
    #[serde(default = "default_index_file")]
    index_file: String,
    /// Etag generation settings.
    #[serde(default)]
    etag: EtagConfig,
}

#[derive(Clone)]
struct CachedTag {
    modified: Option<SystemTime>,
    length: u64,
    tag: String,
}

/// Application serving files from a directory tree.
pub struct StaticFilesApp {
    name: String,
    site_directory: PathBuf,
    not_found_path: Option<PathBuf>,
    index_file: String,
    etag: EtagConfig,
    tags: Mutex<IndexMap<PathBuf, CachedTag>>,
}

impl std::fmt::Debug for StaticFilesApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticFilesApp")
            .field("name", &self.name)
            .field("site_directory", &self.site_directory)
            .finish()
    }
}

impl StaticFilesApp {
    pub fn from_config(
        name: &str,
        options: &serde_json::Map<String, serde_json::Value>,
        base_dir: &Path,
    ) -> Result<Self, AppBuildError> {
        let options: StaticFilesOptions = parse_options(name, options)?;
        let site_directory = base_dir.join(&options.site_directory);
        if !site_directory.is_dir() {
            return Err(AppBuildError::BadOptions {
                name: name.to_string(),
                detail: format!("site_directory is not a directory: {site_directory:?}"),
            });
        }
        let not_found_path = options.not_found_path.map(|p| site_directory.join(p));
        Ok(Self {
            name: name.to_string(),
            site_directory,
            not_found_path,
            index_file: options.index_file,
            etag: options.etag,
            tags: Mutex::new(IndexMap::new()),
        })
    }

    /// Map the dispatched remainder onto a filesystem path. Dot
    /// segments and interior empty components are refused.
    fn resolve(&self, dispatch: &DispatchInfo) -> Option<PathBuf> {
        let components = dispatch.extra().components();
        let last = components.len().saturating_sub(1);
        let mut path = self.site_directory.clone();
        for (i, component) in components.iter().enumerate() {
            if component.is_empty() {
                // Only acceptable as the trailing directory marker.
                if i != last {
                    return None;
                }
                continue;
            }
            if component == "." || component == ".." || component.contains('\\') {
                return None;
            }
            path.push(component.as_str());
        }
        Some(path)
    }

    async fn etag_for(&self, path: &Path, data: &Bytes) -> String {
        let metadata = tokio::fs::metadata(path).await.ok();
        let modified = metadata.as_ref().and_then(|m| m.modified().ok());
        let length = data.len() as u64;

        {
            let tags = self.tags.lock();
            if let Some(cached) = tags.get(path) {
                if cached.modified == modified && cached.length == length {
                    return cached.tag.clone();
                }
            }
        }

        let tag = etag::compute(&self.etag, data);
        let mut tags = self.tags.lock();
        if tags.len() >= ETAG_CACHE_CAPACITY {
            tags.shift_remove_index(0);
        }
        tags.insert(path.to_path_buf(), CachedTag { modified, length, tag: tag.clone() });
        tag
    }

    async fn not_found_response(&self) -> response::Response {
        if let Some(path) = &self.not_found_path {
            if let Ok(data) = tokio::fs::read(path).await {
                return response::full(
                    StatusCode::NOT_FOUND,
                    content_type_for(path),
                    Bytes::from(data),
                );
            }
        }
        response::not_found()
    }

    async fn serve_file(
        &self,
        request: &IncomingRequest,
        path: &Path,
    ) -> Result<HandlerResult, AppError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => Bytes::from(data),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HandlerResult::Handled(self.not_found_response().await));
            }
            Err(error) => return Err(error.into()),
        };
        let content_type = content_type_for(path);
        let tag = self.etag_for(path, &data).await;

        if let Some(candidates) = request
            .headers()
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
        {
            if etag::none_match(candidates, &tag) {
                let mut resp = response::status_only(StatusCode::NOT_MODIFIED);
                if let Ok(value) = tag.parse() {
                    resp.headers_mut().insert(ETAG, value);
                }
                return Ok(HandlerResult::Handled(resp));
            }
        }

        let mut resp = match response::parse_range(request.headers(), data.len() as u64) {
            RangeOutcome::Whole => {
                response::full(StatusCode::OK, content_type, data.clone())
            }
            RangeOutcome::Partial { start, end } => {
                response::partial_content(content_type, &data, start, end)
            }
            RangeOutcome::Unsatisfiable => {
                return Ok(HandlerResult::Handled(response::range_not_satisfiable(
                    data.len() as u64,
                )));
            }
        };
        if let Ok(value) = tag.parse() {
            resp.headers_mut().insert(ETAG, value);
        }
        Ok(HandlerResult::Handled(resp))
    }
}

#[async_trait]
impl Application for StaticFilesApp {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_request(
        &self,
        request: &IncomingRequest,
        dispatch: DispatchInfo,
    ) -> Result<HandlerResult, AppError> {
        if request.method() != Method::GET && request.method() != Method::HEAD {
            return Ok(HandlerResult::NotHandled);
        }

        let Some(mut path) = self.resolve(&dispatch) else {
            return Ok(HandlerResult::Handled(self.not_found_response().await));
        };

        if dispatch.is_directory() {
            path.push(&self.index_file);
            return self.serve_file(request, &path).await;
        }

        // A file-form request naming a directory redirects to the
        // directory form so relative links resolve.
        if tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
            let target = dispatch.redirect_to_directory_string();
            return Ok(HandlerResult::Handled(response::redirect(
                StatusCode::PERMANENT_REDIRECT,
                &target,
            )));
        }

        self.serve_file(request, &path).await
    }
}

/// Content type by file extension; octet-stream when unknown.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",
        Some("woff2") => "font/woff2",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[path = "static_files_tests.rs"]
mod tests;
