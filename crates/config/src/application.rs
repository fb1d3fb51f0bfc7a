// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application blocks: named request handlers.

use serde::{Deserialize, Serialize};

/// One `application "name" { }` block.
///
/// `class` selects a registered implementation; every other attribute
/// in the block is collected into `options` and validated by that
/// implementation when the hierarchy is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name (injected from the block label)
    #[serde(skip)]
    pub name: String,
    /// Implementation class, e.g. `static-files`, `redirector`.
    pub class: String,
    /// Class-specific options.
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}
