// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::component::ComponentState;
use crate::events::EventSource;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn records() -> EventSource<sy_core::LogRecord> {
    EventSource::new(16)
}

fn parse(hcl: &str) -> ServerConfig {
    let config = ServerConfig::parse(hcl).unwrap();
    config.validate().unwrap();
    config
}

/// A port that was free a moment ago.
fn pick_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// One raw HTTP/1.1 exchange against a local port.
async fn http_get(port: u16, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .unwrap();
    let request =
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    String::from_utf8_lossy(&raw).to_string()
}

const BASIC: &str = r#"
endpoint "main" {
  interface = "127.0.0.1:0"
  protocol  = "http"

  mount {
    application = "away"
  }
}

application "away" {
  class  = "redirector"
  target = "https://elsewhere.test/"
}

service "info" {
  class = "process-info-file"
  path  = "run/info.json"
}
"#;

#[tokio::test]
async fn builds_the_expected_tree_shape() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse(BASIC);
    let root = build_hierarchy(&config, dir.path(), records()).unwrap();

    let groups: Vec<String> = root
        .children()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(groups, vec!["services", "applications", "endpoints"]);

    let children = root.children();
    assert_eq!(children[0].children().len(), 1);
    assert_eq!(children[1].children().len(), 1);
    assert_eq!(children[2].children().len(), 1);
    assert_eq!(children[2].children()[0].name().as_str(), "main");
}

#[tokio::test]
async fn started_tree_serves_and_stops_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = parse(BASIC);
    let root = build_hierarchy(&config, dir.path(), records()).unwrap();
    root.start().await.unwrap();
    assert_eq!(root.state(), ComponentState::Running);

    // The info service wrote its file at start.
    assert!(dir.path().join("run/info.json").exists());

    root.stop(false).await;
    assert_eq!(root.state(), ComponentState::Stopped);
}

#[tokio::test]
async fn request_flows_to_the_application() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("www")).unwrap();
    std::fs::write(dir.path().join("www/index.html"), "hello from files").unwrap();

    let port = pick_port();
    let config = parse(&format!(
        r#"
endpoint "main" {{
  interface = "127.0.0.1:{port}"
  protocol  = "http"

  mount {{
    application = "site"
  }}
}}

application "site" {{
  class          = "static-files"
  site_directory = "www"
}}
"#
    ));
    let root = build_hierarchy(&config, dir.path(), records()).unwrap();
    root.start().await.unwrap();

    let response = http_get(port, "/").await;
    assert!(response.starts_with("HTTP/1.1 200"), "response: {response}");
    assert!(response.ends_with("hello from files"));

    let missing = http_get(port, "/nope").await;
    assert!(missing.starts_with("HTTP/1.1 404"), "response: {missing}");

    root.stop(false).await;
    assert_eq!(root.state(), ComponentState::Stopped);
}

#[test]
fn unknown_service_class_is_rejected() {
    let config = ServerConfig::parse(
        r#"
endpoint "main" {
  interface = "127.0.0.1:0"
  protocol  = "http"

  mount {
    application = "away"
  }
}

application "away" {
  class  = "redirector"
  target = "https://x.test/"
}

service "odd" {
  class = "mystery"
}
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let result = build_hierarchy(&config, dir.path(), records());
    assert!(matches!(
        result,
        Err(HierarchyError::UnknownServiceClass { .. })
    ));
}

#[test]
fn unknown_application_class_is_rejected() {
    let config = ServerConfig::parse(
        r#"
endpoint "main" {
  interface = "127.0.0.1:0"
  protocol  = "http"

  mount {
    application = "odd"
  }
}

application "odd" {
  class = "mystery"
}
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let result = build_hierarchy(&config, dir.path(), records());
    assert!(matches!(
        result,
        Err(HierarchyError::UnknownApplicationClass { .. })
    ));
}

#[test]
fn router_with_unknown_target_is_rejected() {
    let config = ServerConfig::parse(
        r#"
endpoint "main" {
  interface = "127.0.0.1:0"
  protocol  = "http"

  mount {
    application = "router"
  }
}

application "router" {
  class = "path-router"
  paths = { "/a/*" = "ghost" }
}
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let result = build_hierarchy(&config, dir.path(), records());
    assert!(matches!(
        result,
        Err(HierarchyError::UnknownRouteTarget { .. })
    ));
}

#[test]
fn endpoint_service_of_wrong_class_is_rejected() {
    let config = ServerConfig::parse(
        r#"
endpoint "main" {
  interface = "127.0.0.1:0"
  protocol  = "http"

  mount {
    application = "away"
  }

  services {
    rate_limiter = "info"
  }
}

application "away" {
  class  = "redirector"
  target = "https://x.test/"
}

service "info" {
  class = "process-info-file"
  path  = "run/info.json"
}
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let result = build_hierarchy(&config, dir.path(), records());
    assert!(matches!(
        result,
        Err(HierarchyError::ServiceClassMismatch { .. })
    ));
}

/// A whole config through a real socket: static files behind a rate
/// limiter and a request logger.
#[tokio::test]
async fn full_stack_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("www")).unwrap();
    std::fs::write(dir.path().join("www/index.html"), "ok").unwrap();

    let port = pick_port();
    let config = parse(&format!(
        r#"
endpoint "main" {{
  interface = "127.0.0.1:{port}"
  protocol  = "http"

  mount {{
    application = "site"
  }}

  services {{
    rate_limiter   = "limiter"
    request_logger = "requests"
  }}
}}

application "site" {{
  class          = "static-files"
  site_directory = "www"
}}

service "limiter" {{
  class = "rate-limiter"
  data  = {{ burst_size = 65536, flow_rate = 65536 }}
}}

service "requests" {{
  class = "request-logger"
  path  = "log/requests.log"
}}
"#
    ));
    let root = build_hierarchy(&config, dir.path(), records()).unwrap();
    root.start().await.unwrap();

    let response = http_get(port, "/").await;
    assert!(response.starts_with("HTTP/1.1 200"), "response: {response}");

    root.stop(false).await;

    let log = std::fs::read_to_string(dir.path().join("log/requests.log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1, "log: {log:?}");
    assert!(lines[0].contains(" http GET / 200 2B "), "line: {}", lines[0]);
    assert!(lines[0].ends_with(" ok"));
}
