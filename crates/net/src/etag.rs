// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity-tag generation.
//!
//! Tags are base64url digests: weak tags (`W/"…"`) truncate the digest
//! (default 16 characters); strong tags (`"…"`) use the full digest.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};

const DEFAULT_WEAK_LENGTH: usize = 16;

/// Digest algorithm for etags.
///
/// Only the sha2 family is carried; configs asking for `sha1` are
/// turned away at hierarchy build with a pointer at `sha256`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

/// Etag generation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtagConfig {
    pub algorithm: HashAlgorithm,
    /// Weak tags (`W/"…"`) unless set false.
    pub weak: bool,
    /// Tag character length; `None` means the default for the
    /// strength (16 weak, full digest strong).
    pub length: Option<usize>,
}

impl Default for EtagConfig {
    fn default() -> Self {
        Self { algorithm: HashAlgorithm::default(), weak: true, length: None }
    }
}

/// Compute the etag header value for `data`.
pub fn compute(config: &EtagConfig, data: &[u8]) -> String {
    let digest = match config.algorithm {
        HashAlgorithm::Sha256 => URL_SAFE_NO_PAD.encode(Sha256::digest(data)),
        HashAlgorithm::Sha512 => URL_SAFE_NO_PAD.encode(Sha512::digest(data)),
    };
    let tag: &str = match (config.weak, config.length) {
        (true, None) => &digest[..DEFAULT_WEAK_LENGTH.min(digest.len())],
        (_, Some(length)) => &digest[..length.min(digest.len())],
        (false, None) => &digest,
    };
    if config.weak {
        format!("W/\"{tag}\"")
    } else {
        format!("\"{tag}\"")
    }
}

/// Whether an `if-none-match` header value matches `etag`, using weak
/// comparison.
pub fn none_match(header: &str, etag: &str) -> bool {
    if header.trim() == "*" {
        return true;
    }
    let normalize = |tag: &str| tag.trim().trim_start_matches("W/").to_string();
    let wanted = normalize(etag);
    header.split(',').any(|candidate| normalize(candidate) == wanted)
}

#[cfg(test)]
#[path = "etag_tests.rs"]
mod tests;
