// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn path(p: &str) -> PathKey {
    PathKey::parse_path(p).unwrap()
}

fn pattern(p: &str) -> PathKey {
    PathKey::parse_path_pattern(p).unwrap()
}

fn host(h: &str) -> PathKey {
    PathKey::parse_hostname(h, true).unwrap()
}

#[test]
fn add_rejects_duplicate_binding() {
    let mut map = PathMap::new();
    map.add(&pattern("/a/*"), 1).unwrap();
    assert!(matches!(
        map.add(&pattern("/a/*"), 2),
        Err(PathMapError::AlreadyBound(_))
    ));
    // Exact and wildcard with the same components are distinct keys.
    map.add(&pattern("/a"), 3).unwrap();
    assert_eq!(map.len(), 2);
}

#[test]
fn exact_beats_wildcard() {
    let mut map = PathMap::new();
    map.add(&pattern("/a/b"), "exact").unwrap();
    map.add(&pattern("/a/*"), "wild").unwrap();

    let hit = map.find(&path("/a/b")).unwrap();
    assert_eq!(*hit.value(), "exact");
    assert!(hit.key_remainder().is_empty());

    let hit = map.find(&path("/a/c")).unwrap();
    assert_eq!(*hit.value(), "wild");
    assert_eq!(hit.key_remainder().path_display_relative(), "c");
}

#[test]
fn longest_prefix_wins() {
    let mut map = PathMap::new();
    map.add(&pattern("/a/*"), "short").unwrap();
    map.add(&pattern("/a/b/*"), "long").unwrap();

    let hit = map.find(&path("/a/b/c")).unwrap();
    assert_eq!(*hit.value(), "long");
    assert_eq!(hit.key().path_display(), "/a/b/*");
    assert_eq!(hit.key_remainder().path_display_relative(), "c");
}

#[test]
fn wildcard_matches_improper_prefix() {
    let mut map = PathMap::new();
    map.add(&pattern("/a/*"), "wild").unwrap();

    let hit = map.find(&path("/a")).unwrap();
    assert_eq!(*hit.value(), "wild");
    assert!(hit.key_remainder().is_empty());
}

#[test]
fn exact_requires_full_match() {
    let mut map = PathMap::new();
    map.add(&pattern("/a/b"), "exact").unwrap();

    assert!(map.find(&path("/a")).is_none());
    assert!(map.find(&path("/a/b/c")).is_none());
    // Directory form is a different key than file form.
    assert!(map.find(&path("/a/b/")).is_none());
}

#[test]
fn next_iterates_less_specific_wildcards() {
    let mut map = PathMap::new();
    map.add(&pattern("/*"), "root").unwrap();
    map.add(&pattern("/a/*"), "a").unwrap();
    map.add(&pattern("/a/b/*"), "ab").unwrap();
    map.add(&pattern("/a/b/c"), "abc").unwrap();

    let hit = map.find(&path("/a/b/c")).unwrap();
    assert_eq!(*hit.value(), "abc");
    let hit = hit.next().unwrap();
    assert_eq!(*hit.value(), "ab");
    assert_eq!(hit.key_remainder().path_display_relative(), "c");
    let hit = hit.next().unwrap();
    assert_eq!(*hit.value(), "a");
    assert_eq!(hit.key_remainder().path_display_relative(), "b/c");
    let hit = hit.next().unwrap();
    assert_eq!(*hit.value(), "root");
    let end = hit.next();
    assert!(end.is_none());
}

#[test]
fn hostname_wildcards_match_subdomains() {
    let mut map = PathMap::new();
    map.add(&host("a.example.com"), "a").unwrap();
    map.add(&host("*.example.com"), "sub").unwrap();
    map.add(&host("*"), "any").unwrap();

    let exact = map.find(&host("a.example.com")).unwrap();
    assert_eq!(*exact.value(), "a");

    let sub = map.find(&host("b.example.com")).unwrap();
    assert_eq!(*sub.value(), "sub");

    let deep = map.find(&host("x.y.example.com")).unwrap();
    assert_eq!(*deep.value(), "sub");

    let other = map.find(&host("other.com")).unwrap();
    assert_eq!(*other.value(), "any");
}

#[test]
fn subdomain_wildcard_requires_proper_subdomain() {
    let mut map = PathMap::new();
    map.add(&host("*.example.com"), "sub").unwrap();

    // "example.com" itself is an improper extension, which wildcard
    // keys do match; the caller distinguishes by remainder when it
    // cares.
    let hit = map.find(&host("example.com")).unwrap();
    assert!(hit.key_remainder().is_empty());

    assert!(map.find(&host("example.org")).is_none());
}

#[test]
fn find_miss_returns_none() {
    let mut map = PathMap::new();
    map.add(&pattern("/a/b"), 1).unwrap();
    assert!(map.find(&path("/z")).is_none());
}

proptest! {
    /// Exact bindings always beat wildcard bindings at the same
    /// components.
    #[test]
    fn prop_exact_beats_wildcard(parts in proptest::collection::vec("[a-z]{1,4}", 1..5)) {
        let key = PathKey::new(parts.iter().map(|s| s.as_str().into()).collect(), false);
        let wild = PathKey::new(key.components().to_vec(), true);
        let mut map = PathMap::new();
        map.add(&key, "exact").unwrap();
        map.add(&wild, "wild").unwrap();
        let hit = map.find(&key).unwrap();
        prop_assert_eq!(*hit.value(), "exact");
    }

    /// The matched key plus the remainder always reassembles the
    /// query.
    #[test]
    fn prop_key_plus_remainder_is_query(
        bound in proptest::collection::vec("[a-z]{1,4}", 0..4),
        extra in proptest::collection::vec("[a-z]{1,4}", 0..4),
    ) {
        let bound_key = PathKey::new(bound.iter().map(|s| s.as_str().into()).collect(), true);
        let mut map = PathMap::new();
        map.add(&bound_key, ()).unwrap();

        let mut query_parts = bound.clone();
        query_parts.extend(extra.clone());
        let query = PathKey::new(query_parts.iter().map(|s| s.as_str().into()).collect(), false);

        let hit = map.find(&query).unwrap();
        let rebuilt = hit.key().without_wildcard().concat(hit.key_remainder());
        prop_assert_eq!(rebuilt.components(), query.components());
    }
}
