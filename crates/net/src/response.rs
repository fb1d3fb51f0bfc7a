// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response construction helpers and byte-range handling.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use serde_json::json;

/// The body type every handler produces.
pub type Body = Full<Bytes>;

/// The response type every handler produces.
pub type Response = http::Response<Body>;

/// Structured response summary for the request log.
pub fn info_for_log(response: &Response, body_len: Option<u64>) -> serde_json::Value {
    json!({
        "status": response.status().as_u16(),
        "content_length": body_len,
    })
}

fn build(status: StatusCode, content_type: &str, body: Bytes) -> Response {
    let length = body.len();
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if !content_type.is_empty() {
        if let Ok(value) = content_type.parse() {
            headers.insert(CONTENT_TYPE, value);
        }
    }
    if let Ok(value) = length.to_string().parse() {
        headers.insert(CONTENT_LENGTH, value);
    }
    response
}

/// A response with the given status, content type, and full body.
pub fn full(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response {
    build(status, content_type, body.into())
}

/// A bodyless response with the given status.
pub fn status_only(status: StatusCode) -> Response {
    build(status, "", Bytes::new())
}

/// A plain-text response.
pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Response {
    build(status, "text/plain; charset=utf-8", body.into())
}

/// The default not-found page.
pub fn not_found() -> Response {
    html_status(StatusCode::NOT_FOUND)
}

/// A minimal HTML page for `status`.
pub fn html_status(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        "<!doctype html>\n<html><head><title>{code} {reason}</title></head>\n\
         <body><h1>{code} {reason}</h1></body></html>\n",
        code = status.as_u16(),
    );
    build(status, "text/html; charset=utf-8", Bytes::from(body))
}

/// A redirect to `target` with a small HTML body.
pub fn redirect(status: StatusCode, target: &str) -> Response {
    debug_assert!(status.is_redirection());
    let body = format!(
        "<!doctype html>\n<html><body>Redirecting to \
         <a href=\"{target}\">{target}</a></body></html>\n"
    );
    let mut response = build(status, "text/html; charset=utf-8", Bytes::from(body));
    if let Ok(value) = target.parse() {
        response.headers_mut().insert(LOCATION, value);
    }
    response
}

/// Result of interpreting a `range` header against a body of `length`
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No (usable) range header; serve the whole body.
    Whole,
    /// Serve `start..=end` as a 206.
    Partial { start: u64, end: u64 },
    /// Requested range cannot be satisfied; respond 416.
    Unsatisfiable,
}

/// Interpret a `bytes` range request per RFC 7233.
///
/// Only single ranges are honored; multi-range requests fall back to
/// the whole body, and syntactically foreign units are ignored.
pub fn parse_range(headers: &HeaderMap, length: u64) -> RangeOutcome {
    let Some(raw) = headers.get(RANGE).and_then(|v| v.to_str().ok()) else {
        return RangeOutcome::Whole;
    };
    let Some(spec) = raw.trim().strip_prefix("bytes=") else {
        return RangeOutcome::Whole;
    };
    if spec.contains(',') {
        return RangeOutcome::Whole;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeOutcome::Whole;
    };

    if start_str.is_empty() {
        // Suffix form: bytes=-N, the final N bytes.
        let Ok(suffix) = end_str.parse::<u64>() else {
            return RangeOutcome::Whole;
        };
        if suffix == 0 || length == 0 {
            return RangeOutcome::Unsatisfiable;
        }
        let start = length.saturating_sub(suffix);
        return RangeOutcome::Partial { start, end: length - 1 };
    }

    let Ok(start) = start_str.parse::<u64>() else {
        return RangeOutcome::Whole;
    };
    if start >= length {
        return RangeOutcome::Unsatisfiable;
    }
    let end = if end_str.is_empty() {
        length - 1
    } else {
        match end_str.parse::<u64>() {
            Ok(end) => end.min(length - 1),
            Err(_) => return RangeOutcome::Whole,
        }
    };
    if end < start {
        return RangeOutcome::Unsatisfiable;
    }
    RangeOutcome::Partial { start, end }
}

/// A 206 carrying `body[start..=end]` with its `content-range`.
pub fn partial_content(
    content_type: &str,
    body: &Bytes,
    start: u64,
    end: u64,
) -> Response {
    let slice = body.slice(start as usize..=end as usize);
    let mut response = build(StatusCode::PARTIAL_CONTENT, content_type, slice);
    let range = format!("bytes {start}-{end}/{}", body.len());
    if let Ok(value) = range.parse() {
        response.headers_mut().insert(CONTENT_RANGE, value);
    }
    response
}

/// A 416 with `content-range: bytes */<length>`.
pub fn range_not_satisfiable(length: u64) -> Response {
    let mut response = status_only(StatusCode::RANGE_NOT_SATISFIABLE);
    if let Ok(value) = format!("bytes */{length}").parse() {
        response.headers_mut().insert(CONTENT_RANGE, value);
    }
    response
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
