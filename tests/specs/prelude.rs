//! Shared harness for the end-to-end specs.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Upper bound for condition polling.
pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

/// Poll `condition` until it holds or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

/// A port that was free a moment ago.
pub fn pick_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind probe listener");
    listener.local_addr().expect("probe addr").port()
}

/// One raw HTTP/1.1 exchange; returns the whole response text, or an
/// empty string when the connection is refused.
pub fn http_get(port: u16, host: &str, path: &str) -> String {
    let Ok(mut stream) = TcpStream::connect(("127.0.0.1", port)) else {
        return String::new();
    };
    let request =
        format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    if stream.write_all(request.as_bytes()).is_err() {
        return String::new();
    }
    let mut raw = Vec::new();
    let _ = stream.read_to_end(&mut raw);
    String::from_utf8_lossy(&raw).to_string()
}

pub fn can_connect(port: u16) -> bool {
    TcpStream::connect(("127.0.0.1", port)).is_ok()
}

/// A running `syd` under a temp directory.
pub struct Server {
    pub dir: tempfile::TempDir,
    pub port: u16,
    child: Child,
}

/// A config written to disk but not yet running, so specs can lay
/// down site files first.
pub struct PreparedServer {
    dir: tempfile::TempDir,
    port: u16,
}

impl PreparedServer {
    /// Write `config` (with `{port}` substituted) into a fresh temp
    /// dir.
    pub fn new(config: &str) -> PreparedServer {
        let dir = tempfile::tempdir().expect("temp dir");
        let port = pick_port();
        let config = config.replace("{port}", &port.to_string());
        std::fs::write(dir.path().join("sy.hcl"), config).expect("write config");
        PreparedServer { dir, port }
    }

    /// Create a static site directory with an index body.
    pub fn site(&self, name: &str, body: &str) -> &Self {
        write_site(self.dir.path(), name, body);
        self
    }

    /// Start `syd` and wait for the listener.
    pub fn launch(self) -> Server {
        let child = Command::new(syd_binary())
            .arg("--config")
            .arg(self.dir.path().join("sy.hcl"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn syd");

        let server = Server { dir: self.dir, port: self.port, child };
        assert!(
            wait_for(SPEC_WAIT_MAX_MS, || can_connect(server.port)),
            "syd should start listening"
        );
        server
    }
}

impl Server {
    /// Write `config` into a temp dir and start `syd` against it.
    pub fn start(config: &str) -> Server {
        PreparedServer::new(config).launch()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("sy.hcl")
    }

    /// Overwrite the config file in place (for reload specs).
    pub fn rewrite_config(&self, config: &str) {
        let config = config.replace("{port}", &self.port.to_string());
        std::fs::write(self.config_path(), config).expect("rewrite config");
    }

    pub fn signal(&self, signal: nix::sys::signal::Signal) {
        nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(self.child.id() as i32),
            signal,
        )
        .expect("send signal");
    }

    /// Wait for exit and return the status code.
    pub fn wait_exit(&mut self) -> Option<i32> {
        let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
        loop {
            match self.child.try_wait().expect("try_wait") {
                Some(status) => return status.code(),
                None if Instant::now() > deadline => {
                    let _ = self.child.kill();
                    panic!("syd did not exit in time");
                }
                None => std::thread::sleep(Duration::from_millis(50)),
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Path to the built `syd` binary.
pub fn syd_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("syd")
}

/// Create a static site directory under `dir` with an index body.
pub fn write_site(dir: &Path, name: &str, body: &str) {
    let site = dir.join(name);
    std::fs::create_dir_all(&site).expect("site dir");
    std::fs::write(site.join("index.html"), body).expect("index");
}
