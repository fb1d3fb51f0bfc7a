// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validated names for components, endpoints, applications, and services.

use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Errors from name validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("name must start with a letter or digit: {0:?}")]
    BadFirstChar(String),

    #[error("name contains invalid character {1:?}: {0:?}")]
    BadChar(String, char),
}

/// A component name: URL-safe identifier, unique among siblings.
///
/// Allowed characters are ASCII letters, digits, `-`, and `_`; the
/// first character must be a letter or digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComponentName(SmolStr);

impl ComponentName {
    pub fn new(name: &str) -> Result<Self, NameError> {
        let mut chars = name.chars();
        let first = chars.next().ok_or(NameError::Empty)?;
        if !first.is_ascii_alphanumeric() {
            return Err(NameError::BadFirstChar(name.to_string()));
        }
        for c in chars {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
                return Err(NameError::BadChar(name.to_string(), c));
            }
        }
        Ok(Self(SmolStr::new(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ComponentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ComponentName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ComponentName {
    type Error = NameError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ComponentName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
