// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Componentized keys for hostnames and URI paths.
//!
//! A [`PathKey`] is an ordered sequence of components plus a wildcard
//! flag. Hostnames are stored in wire order (TLD first) so the path
//! map branches on the most-significant label; URI paths are stored
//! left to right, with a trailing empty component marking directory
//! form.

use serde::Serialize;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors from key parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathKeyError {
    #[error("hostname is empty")]
    EmptyHostname,

    #[error("hostname has an empty label: {0:?}")]
    EmptyLabel(String),

    #[error("hostname label contains invalid character {1:?}: {0:?}")]
    BadLabelChar(String, char),

    #[error("wildcard not allowed here: {0:?}")]
    WildcardNotAllowed(String),

    #[error("wildcard must be the leading label: {0:?}")]
    MisplacedWildcard(String),

    #[error("path must start with '/': {0:?}")]
    NotAbsolute(String),

    #[error("path pattern has an empty component: {0:?}")]
    EmptyComponent(String),

    #[error("path pattern component may not be {1:?}: {0:?}")]
    BadComponent(String, String),
}

/// An ordered sequence of string components plus a wildcard flag.
///
/// Wildcard keys match any extension of their components. Components
/// never contain `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PathKey {
    components: Vec<SmolStr>,
    wildcard: bool,
}

impl PathKey {
    pub fn new(components: Vec<SmolStr>, wildcard: bool) -> Self {
        debug_assert!(components.iter().all(|c| !c.contains('/')));
        Self { components, wildcard }
    }

    /// The root key: no components, non-wildcard.
    pub fn root() -> Self {
        Self { components: Vec::new(), wildcard: false }
    }

    /// The match-anything key: no components, wildcard.
    pub fn any() -> Self {
        Self { components: Vec::new(), wildcard: true }
    }

    pub fn components(&self) -> &[SmolStr] {
        &self.components
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Whether the final component is empty (directory form for paths).
    pub fn ends_with_empty(&self) -> bool {
        self.components.last().is_some_and(|c| c.is_empty())
    }

    /// This key's components followed by `other`'s; `other` decides
    /// the wildcard flag.
    pub fn concat(&self, other: &PathKey) -> PathKey {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        PathKey { components, wildcard: other.wildcard }
    }

    /// A copy of this key without the wildcard flag.
    pub fn without_wildcard(&self) -> PathKey {
        PathKey { components: self.components.clone(), wildcard: false }
    }

    /// Parse a hostname or hostname pattern.
    ///
    /// `*` matches anything; `*.suffix` matches proper subdomains of
    /// `suffix`. Labels are lowercased; components are stored in wire
    /// order (rightmost label first).
    pub fn parse_hostname(input: &str, allow_wildcard: bool) -> Result<Self, PathKeyError> {
        if input.is_empty() {
            return Err(PathKeyError::EmptyHostname);
        }

        let (wildcard, rest) = if input == "*" {
            (true, "")
        } else if let Some(rest) = input.strip_prefix("*.") {
            (true, rest)
        } else {
            (false, input)
        };

        if wildcard && !allow_wildcard {
            return Err(PathKeyError::WildcardNotAllowed(input.to_string()));
        }

        let mut components = Vec::new();
        if !rest.is_empty() {
            // Reverse so the TLD is the first component.
            for label in rest.split('.').rev() {
                if label.is_empty() {
                    return Err(PathKeyError::EmptyLabel(input.to_string()));
                }
                for c in label.chars() {
                    if c == '*' {
                        return Err(PathKeyError::MisplacedWildcard(input.to_string()));
                    }
                    if !c.is_ascii_alphanumeric() && c != '-' {
                        return Err(PathKeyError::BadLabelChar(input.to_string(), c));
                    }
                }
                components.push(SmolStr::new(label.to_ascii_lowercase()));
            }
        } else if !wildcard {
            return Err(PathKeyError::EmptyHostname);
        }

        Ok(Self { components, wildcard })
    }

    /// Parse a request-URI path.
    ///
    /// The path must be absolute. A trailing `/` yields a trailing
    /// empty component (directory form); interior empty components are
    /// preserved and left for applications to reject. `/` itself
    /// parses to a single empty component.
    pub fn parse_path(input: &str) -> Result<Self, PathKeyError> {
        let rest = input
            .strip_prefix('/')
            .ok_or_else(|| PathKeyError::NotAbsolute(input.to_string()))?;
        let components = rest.split('/').map(SmolStr::new).collect();
        Ok(Self { components, wildcard: false })
    }

    /// Parse a mount path pattern.
    ///
    /// Patterns start with `/`. A trailing `/*` denotes a wildcard
    /// prefix mount; otherwise the mount is exact. Empty interior
    /// components and dot components are rejected.
    pub fn parse_path_pattern(input: &str) -> Result<Self, PathKeyError> {
        let rest = input
            .strip_prefix('/')
            .ok_or_else(|| PathKeyError::NotAbsolute(input.to_string()))?;

        if rest == "*" {
            return Ok(Self { components: Vec::new(), wildcard: true });
        }

        let (wildcard, rest) = match rest.strip_suffix("/*") {
            Some(prefix) => (true, prefix),
            None => (false, rest),
        };

        let raw: Vec<&str> = rest.split('/').collect();
        let last = raw.len().saturating_sub(1);
        let mut components = Vec::with_capacity(raw.len());
        for (i, part) in raw.iter().enumerate() {
            if part.is_empty() && (wildcard || i != last) {
                return Err(PathKeyError::EmptyComponent(input.to_string()));
            }
            if *part == "." || *part == ".." {
                return Err(PathKeyError::BadComponent(input.to_string(), part.to_string()));
            }
            if part.contains('*') {
                return Err(PathKeyError::BadComponent(input.to_string(), part.to_string()));
            }
            components.push(SmolStr::new(*part));
        }

        Ok(Self { components, wildcard })
    }

    /// Render as a path string: `/a/b`, `/a/b/` (directory form),
    /// `/a/*` (wildcard), `/` (single empty component or root).
    pub fn path_display(&self) -> String {
        if self.wildcard {
            if self.components.is_empty() {
                return "/*".to_string();
            }
            return format!("/{}/*", self.components.join("/"));
        }
        format!("/{}", self.components.join("/"))
    }

    /// Render as a relative path string with no leading `/`; empty for
    /// the root key.
    pub fn path_display_relative(&self) -> String {
        self.components.join("/")
    }

    /// Render as a hostname string: labels in natural order, `*` or
    /// `*.suffix` for wildcards.
    pub fn hostname_display(&self) -> String {
        let natural: Vec<&str> =
            self.components.iter().rev().map(|c| c.as_str()).collect();
        if self.wildcard {
            if natural.is_empty() {
                return "*".to_string();
            }
            return format!("*.{}", natural.join("."));
        }
        natural.join(".")
    }
}

#[cfg(test)]
#[path = "path_key_tests.rs"]
mod tests;
