// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host blocks: TLS material shared by a set of hostnames.

use serde::{Deserialize, Serialize};

/// One `host { }` block: a certificate/key pair served for all of the
/// listed hostname patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Hostname patterns (`*`, `*.suffix`, or exact).
    pub hostnames: Vec<String>,
    /// Certificate chain: inline PEM or a file path.
    pub certificate: String,
    /// Private key: inline PEM or a file path.
    pub private_key: String,
}

impl HostConfig {
    /// Whether a certificate/key config value is inline PEM rather
    /// than a file path.
    pub fn is_inline_pem(value: &str) -> bool {
        value.trim_start().starts_with("-----BEGIN")
    }
}
