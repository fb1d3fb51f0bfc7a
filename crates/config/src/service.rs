// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service blocks: cross-cutting concerns attached to the system or
//! to individual endpoints.

use serde::{Deserialize, Serialize};

/// One `service "name" { }` block.
///
/// `class` selects a registered implementation (`rate-limiter`,
/// `request-logger`, `system-logger`, `process-info-file`); the rest
/// of the block is class-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name (injected from the block label)
    #[serde(skip)]
    pub name: String,
    /// Implementation class.
    pub class: String,
    /// Class-specific options.
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}
