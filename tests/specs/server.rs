//! End-to-end server specs: routing, logging, reload, shutdown.

use crate::prelude::*;
use serial_test::serial;

const SIMPLE_SITE: &str = r#"
endpoint "main" {
  interface = "127.0.0.1:{port}"
  protocol  = "http"

  mount {
    application = "site"
  }

  services {
    request_logger = "requests"
  }
}

application "site" {
  class          = "static-files"
  site_directory = "www"
}

service "requests" {
  class = "request-logger"
  path  = "log/requests.log"
}
"#;

/// Simple GET route: one endpoint, one wildcard mount, 200 with the
/// body and a request-log line recording `2B ok`.
#[test]
#[serial]
fn simple_get_route() {
    let prepared = PreparedServer::new(SIMPLE_SITE);
    prepared.site("www", "ok");
    let mut server = prepared.launch();

    let response = http_get(server.port, "example.com", "/");
    assert!(response.starts_with("HTTP/1.1 200"), "response: {response}");
    assert!(response.ends_with("ok"));

    server.signal(nix::sys::signal::Signal::SIGTERM);
    assert_eq!(server.wait_exit(), Some(0));

    let log = std::fs::read_to_string(server.dir.path().join("log/requests.log"))
        .expect("request log");
    let line = log.lines().next().expect("one log line");
    assert!(line.contains(" GET / 200 2B "), "line: {line}");
    assert!(line.ends_with(" ok"), "line: {line}");
}

/// Host routing fallthrough: exact hostname beats the subdomain
/// wildcard; an unmatched host 404s.
#[test]
#[serial]
fn host_routing_fallthrough() {
    let prepared = PreparedServer::new(
        r#"
endpoint "main" {
  interface = "127.0.0.1:{port}"
  protocol  = "http"

  mount {
    application = "appA"
    hostname    = "a.example.com"
  }

  mount {
    application = "appB"
    hostname    = "*.example.com"
  }
}

application "appA" {
  class          = "static-files"
  site_directory = "a"
}

application "appB" {
  class          = "static-files"
  site_directory = "b"
}
"#,
    );
    prepared.site("a", "from A");
    prepared.site("b", "from B");
    let server = prepared.launch();

    let a = http_get(server.port, "a.example.com", "/");
    assert!(a.ends_with("from A"), "response: {a}");

    let b = http_get(server.port, "b.example.com", "/");
    assert!(b.ends_with("from B"), "response: {b}");

    let miss = http_get(server.port, "other.com", "/");
    assert!(miss.starts_with("HTTP/1.1 404"), "response: {miss}");
}

/// Path prefix dispatch: the mount consumes `/api`, the remainder
/// rides the redirect target.
#[test]
#[serial]
fn path_prefix_dispatch() {
    let server = Server::start(
        r#"
endpoint "main" {
  interface = "127.0.0.1:{port}"
  protocol  = "http"

  mount {
    application = "api"
    path        = "/api/*"
  }
}

application "api" {
  class  = "redirector"
  target = "https://api.example.com/"
}
"#,
    );

    let response = http_get(server.port, "example.com", "/api/users/7");
    assert!(response.starts_with("HTTP/1.1 308"), "response: {response}");
    assert!(
        response.contains("location: https://api.example.com/users/7"),
        "response: {response}"
    );

    let miss = http_get(server.port, "example.com", "/other");
    assert!(miss.starts_with("HTTP/1.1 404"), "response: {miss}");
}

/// SIGHUP with a broken rewritten config: the reload fails, the old
/// hierarchy keeps serving.
#[test]
#[serial]
fn reload_with_bad_config_keeps_serving() {
    let prepared = PreparedServer::new(SIMPLE_SITE);
    prepared.site("www", "ok");
    let mut server = prepared.launch();

    assert!(http_get(server.port, "x.test", "/").starts_with("HTTP/1.1 200"));

    server.rewrite_config("endpoint \"broken {{{ not hcl");
    server.signal(nix::sys::signal::Signal::SIGHUP);

    // The reload is rejected; service continues uninterrupted.
    assert!(wait_for(2_000, || {
        http_get(server.port, "x.test", "/").starts_with("HTTP/1.1 200")
    }));
    std::thread::sleep(std::time::Duration::from_millis(300));
    assert!(http_get(server.port, "x.test", "/").starts_with("HTTP/1.1 200"));

    server.signal(nix::sys::signal::Signal::SIGTERM);
    assert_eq!(server.wait_exit(), Some(0));
}

/// SIGHUP with a valid rewritten config takes effect in-process.
#[test]
#[serial]
fn reload_applies_new_config() {
    let prepared = PreparedServer::new(SIMPLE_SITE);
    prepared.site("www", "ok");
    prepared.site("www2", "reloaded");
    let mut server = prepared.launch();

    assert!(http_get(server.port, "x.test", "/").ends_with("ok"));

    server.rewrite_config(&SIMPLE_SITE.replace("\"www\"", "\"www2\""));
    server.signal(nix::sys::signal::Signal::SIGHUP);

    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || {
            http_get(server.port, "x.test", "/").ends_with("reloaded")
        }),
        "reload should swap the served site"
    );

    server.signal(nix::sys::signal::Signal::SIGTERM);
    assert_eq!(server.wait_exit(), Some(0));
}

/// SIGTERM: the listener closes and the process exits 0.
#[test]
#[serial]
fn graceful_shutdown_on_sigterm() {
    let prepared = PreparedServer::new(SIMPLE_SITE);
    prepared.site("www", "ok");
    let mut server = prepared.launch();

    server.signal(nix::sys::signal::Signal::SIGTERM);
    assert_eq!(server.wait_exit(), Some(0));
    assert!(!can_connect(server.port), "listener should be closed");
}

/// `--check` validates without serving.
#[test]
#[serial]
fn check_flag_validates_config() {
    let dir = tempfile::tempdir().expect("temp dir");
    let good = dir.path().join("good.hcl");
    std::fs::write(
        &good,
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
"#,
    )
    .expect("write config");
    let bad = dir.path().join("bad.hcl");
    std::fs::write(&bad, "endpoint {{{").expect("write config");

    let ok = std::process::Command::new(syd_binary())
        .args(["--check", "--config"])
        .arg(&good)
        .output()
        .expect("run syd");
    assert!(ok.status.success());

    let err = std::process::Command::new(syd_binary())
        .args(["--check", "--config"])
        .arg(&bad)
        .output()
        .expect("run syd");
    assert!(!err.status.success());
}

/// The process-info service writes JSON on start and records the
/// shutdown disposition on clean exit.
#[test]
#[serial]
fn process_info_file_lifecycle() {
    let prepared = PreparedServer::new(
        r#"
endpoint "main" {
  interface = "127.0.0.1:{port}"
  protocol  = "http"

  mount {
    application = "site"
  }
}

application "site" {
  class          = "static-files"
  site_directory = "www"
}

service "info" {
  class = "process-info-file"
  path  = "run/info.json"
}
"#,
    );
    prepared.site("www", "ok");
    let mut server = prepared.launch();

    let info_path = server.dir.path().join("run/info.json");
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || info_path.exists()),
        "info file should appear"
    );

    server.signal(nix::sys::signal::Signal::SIGTERM);
    assert_eq!(server.wait_exit(), Some(0));

    let info: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&info_path).expect("read info"))
            .expect("parse info");
    assert!(info["pid"].is_number());
    assert_eq!(info["product"]["name"], "switchyard");
    assert_eq!(info["disposition"]["shutdown_requested"], true);
}

/// Startup failure (unparseable config) exits non-zero.
#[test]
#[serial]
fn startup_failure_exits_nonzero() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("sy.hcl");
    std::fs::write(&path, "not a config at all {{{").expect("write config");

    let output = std::process::Command::new(syd_binary())
        .arg("--config")
        .arg(&path)
        .output()
        .expect("run syd");
    assert!(!output.status.success());
}
