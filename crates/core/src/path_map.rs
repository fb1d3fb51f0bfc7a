// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Longest-prefix map keyed by [`PathKey`].
//!
//! Each node can hold two bindings: an exact binding (matches only a
//! query with identical components) and a wildcard binding (matches
//! any extension of its components). Lookup returns the most-specific
//! match and can iterate outward through less-specific wildcard
//! bindings for fallback dispatch.

use crate::path_key::PathKey;
use smol_str::SmolStr;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from map mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathMapError {
    #[error("key already bound: {0:?}")]
    AlreadyBound(PathKey),
}

#[derive(Debug)]
struct Node<V> {
    children: HashMap<SmolStr, Node<V>>,
    exact: Option<V>,
    wildcard: Option<V>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self { children: HashMap::new(), exact: None, wildcard: None }
    }
}

/// A trie from [`PathKey`] to values with longest-prefix lookup.
#[derive(Debug)]
pub struct PathMap<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for PathMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PathMap<V> {
    pub fn new() -> Self {
        Self { root: Node::default(), len: 0 }
    }

    /// Number of bound keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bind `key` to `value`. Each key (components + wildcard flag)
    /// can be bound exactly once.
    pub fn add(&mut self, key: &PathKey, value: V) -> Result<(), PathMapError> {
        let mut node = &mut self.root;
        for component in key.components() {
            node = node.children.entry(component.clone()).or_default();
        }
        let slot = if key.is_wildcard() { &mut node.wildcard } else { &mut node.exact };
        if slot.is_some() {
            return Err(PathMapError::AlreadyBound(key.clone()));
        }
        *slot = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Find the most-specific binding matching `query`.
    ///
    /// An exact binding matches only when the walk consumes the whole
    /// query and the query is itself non-wildcard; it beats any
    /// wildcard binding. Among wildcard bindings, the longest prefix
    /// wins. The returned match carries the unconsumed remainder and
    /// iterates through less-specific wildcard matches via
    /// [`PathMatch::next`].
    pub fn find(&self, query: &PathKey) -> Option<PathMatch<'_, V>> {
        let mut wildcards: Vec<(usize, &V)> = Vec::new();
        let mut node = &self.root;
        let mut consumed = 0;

        loop {
            if let Some(value) = &node.wildcard {
                wildcards.push((consumed, value));
            }
            if consumed == query.len() {
                break;
            }
            match node.children.get(&query.components()[consumed]) {
                Some(child) => {
                    node = child;
                    consumed += 1;
                }
                None => break,
            }
        }

        if consumed == query.len() && !query.is_wildcard() {
            if let Some(value) = &node.exact {
                return Some(PathMatch::new(
                    query.clone(),
                    query.len(),
                    false,
                    value,
                    wildcards,
                ));
            }
        }

        let (depth, value) = wildcards.pop()?;
        Some(PathMatch::new(query.clone(), depth, true, value, wildcards))
    }
}

/// A single lookup result: the stored key that matched, its value, and
/// the query components the stored key did not consume.
#[derive(Debug)]
pub struct PathMatch<'a, V> {
    query: PathKey,
    key: PathKey,
    remainder: PathKey,
    value: &'a V,
    /// Less-specific wildcard matches, most specific last.
    fallbacks: Vec<(usize, &'a V)>,
}

impl<'a, V> PathMatch<'a, V> {
    fn new(
        query: PathKey,
        depth: usize,
        wildcard: bool,
        value: &'a V,
        fallbacks: Vec<(usize, &'a V)>,
    ) -> Self {
        let key = PathKey::new(query.components()[..depth].to_vec(), wildcard);
        let remainder =
            PathKey::new(query.components()[depth..].to_vec(), query.is_wildcard());
        Self { query, key, remainder, value, fallbacks }
    }

    /// The stored key that matched.
    pub fn key(&self) -> &PathKey {
        &self.key
    }

    pub fn value(&self) -> &'a V {
        self.value
    }

    /// Query components beyond the stored key.
    pub fn key_remainder(&self) -> &PathKey {
        &self.remainder
    }

    /// Step outward to the next less-specific wildcard match.
    pub fn next(mut self) -> Option<PathMatch<'a, V>> {
        let (depth, value) = self.fallbacks.pop()?;
        Some(PathMatch::new(self.query, depth, true, value, self.fallbacks))
    }
}

#[cfg(test)]
#[path = "path_map_tests.rs"]
mod tests;
