// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::component::ComponentState;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use sy_core::ComponentName;

struct Inert;

#[async_trait]
impl Component for Inert {}

fn inert_tree(label: &str) -> ComponentHandle {
    ComponentHandle::new(ComponentName::new(label).unwrap(), Arc::new(Inert))
}

/// Builder that fails when the flag is set.
fn switchable_builder(
    fail: Arc<AtomicBool>,
    built: Arc<Mutex<Vec<ComponentHandle>>>,
) -> HierarchyBuilder {
    let counter = AtomicU32::new(0);
    Box::new(move || {
        if fail.load(Ordering::SeqCst) {
            return Err(HierarchyError::UnknownApplicationClass {
                name: "x".to_string(),
                class: "broken".to_string(),
            });
        }
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let tree = inert_tree(&format!("tree{n}"));
        built.lock().push(tree.clone());
        Ok(tree)
    })
}

#[tokio::test]
async fn start_builds_and_starts_the_initial_tree() {
    let built = Arc::new(Mutex::new(Vec::new()));
    let wrapper = HierarchyWrapper::new(
        switchable_builder(Arc::new(AtomicBool::new(false)), built.clone()),
        sy_core::TagLogger::detached(),
    );
    let root = ComponentHandle::new(
        ComponentName::new("system").unwrap(),
        Arc::new(Inert),
    );
    let wrapper = Arc::new(wrapper);
    let handle = ComponentHandle::new(
        ComponentName::new("wrapper").unwrap(),
        wrapper.clone(),
    );
    root.add_child(handle).unwrap();

    root.start().await.unwrap();
    let inner = wrapper.current().await.unwrap();
    assert_eq!(inner.state(), ComponentState::Running);

    root.stop(false).await;
    assert_eq!(inner.state(), ComponentState::Stopped);
}

#[tokio::test]
async fn failed_prepare_leaves_old_tree_running() {
    let fail = Arc::new(AtomicBool::new(false));
    let built = Arc::new(Mutex::new(Vec::new()));
    let wrapper = Arc::new(HierarchyWrapper::new(
        switchable_builder(fail.clone(), built.clone()),
        sy_core::TagLogger::detached(),
    ));
    let handle = ComponentHandle::new(
        ComponentName::new("wrapper").unwrap(),
        wrapper.clone(),
    );
    handle.start().await.unwrap();
    let original = wrapper.current().await.unwrap();

    fail.store(true, Ordering::SeqCst);
    assert!(wrapper.prepare_to_restart().is_err());

    // Old tree untouched and still current.
    let current = wrapper.current().await.unwrap();
    assert_eq!(current.state(), ComponentState::Running);
    assert_eq!(current.name(), original.name());
}

#[tokio::test]
async fn restart_swaps_old_for_staged() {
    let built = Arc::new(Mutex::new(Vec::new()));
    let wrapper = Arc::new(HierarchyWrapper::new(
        switchable_builder(Arc::new(AtomicBool::new(false)), built.clone()),
        sy_core::TagLogger::detached(),
    ));
    let handle = ComponentHandle::new(
        ComponentName::new("wrapper").unwrap(),
        wrapper.clone(),
    );
    handle.start().await.unwrap();
    let old = wrapper.current().await.unwrap();

    let staged = wrapper.prepare_to_restart().unwrap();
    wrapper.restart(staged).await.unwrap();

    // The old tree stopped before the new one started; exactly one
    // running tree remains.
    assert_eq!(old.state(), ComponentState::Stopped);
    let current = wrapper.current().await.unwrap();
    assert_eq!(current.state(), ComponentState::Running);
    assert_ne!(current.name(), old.name());
}
