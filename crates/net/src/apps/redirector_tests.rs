// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::apps::test_support::{dispatch_for, request_for};
use http::header::LOCATION;
use serde_json::json;

fn options(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("options must be an object"),
    }
}

#[test]
fn requires_trailing_slash_on_target() {
    let result =
        RedirectorApp::from_config("r", &options(json!({ "target": "https://x.test" })));
    assert!(matches!(result, Err(AppBuildError::BadOptions { .. })));
}

#[test]
fn rejects_non_redirect_status() {
    let result = RedirectorApp::from_config(
        "r",
        &options(json!({ "target": "https://x.test/", "status": 200 })),
    );
    assert!(matches!(result, Err(AppBuildError::BadOptions { .. })));
}

#[tokio::test]
async fn redirects_extra_onto_target() {
    let app = RedirectorApp::from_config(
        "r",
        &options(json!({ "target": "https://new.test/base/" })),
    )
    .unwrap();

    let request = request_for("old.test", "/legacy/docs/page?x=1");
    let dispatch = dispatch_for("/legacy/*", "/legacy/docs/page");
    let result = app.handle_request(&request, dispatch).await.unwrap();

    let HandlerResult::Handled(response) = result else {
        panic!("expected a redirect");
    };
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "https://new.test/base/docs/page?x=1"
    );
}

#[tokio::test]
async fn configurable_status() {
    let app = RedirectorApp::from_config(
        "r",
        &options(json!({ "target": "https://new.test/", "status": 302 })),
    )
    .unwrap();

    let request = request_for("old.test", "/x");
    let dispatch = dispatch_for("/*", "/x");
    let HandlerResult::Handled(response) =
        app.handle_request(&request, dispatch).await.unwrap()
    else {
        panic!("expected a redirect");
    };
    assert_eq!(response.status(), StatusCode::FOUND);
}
