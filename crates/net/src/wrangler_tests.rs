// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::application::HandlerResult;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Stub handler: 200 `ok` for `/`, optional delay, decline elsewhere.
struct Stub {
    delay: Duration,
}

#[async_trait]
impl RequestHandler for Stub {
    async fn handle(&self, request: &IncomingRequest) -> Result<HandlerResult, AppError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match request.path() {
            "/" => Ok(HandlerResult::Handled(response::text(StatusCode::OK, "ok"))),
            "/boom" => Err(AppError::Internal("boom".to_string())),
            _ => Ok(HandlerResult::NotHandled),
        }
    }
}

#[derive(Default)]
struct CapturedEvents {
    events: Mutex<Vec<RequestEvent>>,
}

impl RequestEventSink for CapturedEvents {
    fn on_request(&self, event: &RequestEvent) {
        self.events.lock().push(event.clone());
    }
}

fn wrangler(
    delay: Duration,
    services: WranglerServices,
) -> ProtocolWrangler {
    ProtocolWrangler::new(
        WranglerConfig {
            name: "test".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            protocol: Protocol::Http,
            stop_grace: Duration::from_secs(2),
        },
        Arc::new(Stub { delay }),
        None,
        services,
        TagLogger::detached(),
    )
    .unwrap()
}

/// One raw HTTP/1.1 exchange; returns (status line, body).
async fn get(addr: SocketAddr, path: &str) -> (String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request =
        format!("GET {path} HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw).to_string();
    let status = text.lines().next().unwrap_or_default().to_string();
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn serves_and_404s() {
    let w = wrangler(Duration::ZERO, WranglerServices::default());
    let addr = w.start().await.unwrap();

    let (status, body) = get(addr, "/").await;
    assert!(status.contains("200"), "status line: {status}");
    assert_eq!(body, "ok");

    let (status, _body) = get(addr, "/nope").await;
    assert!(status.contains("404"), "status line: {status}");

    w.stop().await;
}

#[tokio::test]
async fn backend_error_becomes_500() {
    let w = wrangler(Duration::ZERO, WranglerServices::default());
    let addr = w.start().await.unwrap();

    let (status, _body) = get(addr, "/boom").await;
    assert!(status.contains("500"), "status line: {status}");

    w.stop().await;
}

#[tokio::test]
async fn emits_request_events() {
    let sink = Arc::new(CapturedEvents::default());
    let services = WranglerServices {
        request_sink: Some(sink.clone() as Arc<dyn RequestEventSink>),
        ..WranglerServices::default()
    };
    let w = wrangler(Duration::ZERO, services);
    let addr = w.start().await.unwrap();

    let _ = get(addr, "/").await;
    let _ = get(addr, "/missing").await;
    w.stop().await;

    let events = sink.events.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].status, 200);
    assert_eq!(events[0].method, "GET");
    assert_eq!(events[0].url, "/");
    assert_eq!(events[0].content_length, Some(2));
    assert!(events[0].error_codes.is_empty());
    assert_eq!(events[1].status, 404);
    assert!(events[0].origin.starts_with("127.0.0.1:"));
}

#[tokio::test]
async fn double_start_is_rejected() {
    let w = wrangler(Duration::ZERO, WranglerServices::default());
    let _addr = w.start().await.unwrap();
    assert!(matches!(w.start().await, Err(WranglerError::AlreadyRunning)));
    w.stop().await;
}

#[tokio::test]
async fn stop_on_idle_wrangler_is_a_noop() {
    let w = wrangler(Duration::ZERO, WranglerServices::default());
    w.stop().await;
}

#[tokio::test]
async fn graceful_stop_finishes_in_flight_requests() {
    let w = Arc::new(wrangler(Duration::from_millis(300), WranglerServices::default()));
    let addr = w.start().await.unwrap();

    let in_flight = tokio::spawn(async move { get(addr, "/").await });
    // Let the request reach the handler before stopping.
    tokio::time::sleep(Duration::from_millis(100)).await;

    w.stop().await;

    // The in-flight request completed with its body.
    let (status, body) = in_flight.await.unwrap();
    assert!(status.contains("200"), "status line: {status}");
    assert_eq!(body, "ok");

    // New connections are refused once stop returns.
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn serves_https_with_sni() {
    use rustls::pki_types::ServerName;
    use tokio_rustls::TlsConnector;

    let minted = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let hosts = Arc::new(
        HostManager::from_configs(
            &[sy_config::HostConfig {
                hostnames: vec!["localhost".to_string()],
                certificate: minted.cert.pem(),
                private_key: minted.key_pair.serialize_pem(),
            }],
            std::path::Path::new("."),
        )
        .unwrap(),
    );

    let w = ProtocolWrangler::new(
        WranglerConfig {
            name: "tls".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            protocol: Protocol::Https,
            stop_grace: Duration::from_secs(2),
        },
        Arc::new(Stub { delay: Duration::ZERO }),
        Some(&hosts),
        WranglerServices::default(),
        TagLogger::detached(),
    )
    .unwrap();
    let addr = w.start().await.unwrap();

    // The client trusts the minted certificate directly.
    let mut roots = rustls::RootCertStore::empty();
    roots.add(minted.cert.der().clone()).unwrap();
    let client_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(client_config));

    let tcp = TcpStream::connect(addr).await.unwrap();
    let server_name = ServerName::try_from("localhost").unwrap();
    let mut tls = connector.connect(server_name, tcp).await.unwrap();

    tls.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    let _ = tls.read_to_end(&mut raw).await;
    let text = String::from_utf8_lossy(&raw).to_string();
    assert!(text.starts_with("HTTP/1.1 200"), "response: {text}");
    assert!(text.ends_with("ok"), "response: {text}");

    w.stop().await;
}

#[tokio::test]
async fn secure_protocol_without_hosts_is_rejected() {
    let result = ProtocolWrangler::new(
        WranglerConfig {
            name: "tls".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            protocol: Protocol::Https,
            stop_grace: Duration::from_secs(2),
        },
        Arc::new(Stub { delay: Duration::ZERO }),
        None,
        WranglerServices::default(),
        TagLogger::detached(),
    );
    assert!(matches!(result, Err(WranglerError::MissingHosts(_))));
}

#[tokio::test]
async fn connection_gate_refuses_over_budget_connections() {
    use crate::bucket::BucketConfig;

    // One connection allowed, then the bucket is dry.
    let mut config = BucketConfig::new(1.0, 0.0001);
    config.initial_burst = Some(1.0);
    let services = WranglerServices {
        connection_bucket: Some(TokenBucket::new(config).unwrap()),
        ..WranglerServices::default()
    };
    let w = wrangler(Duration::ZERO, services);
    let addr = w.start().await.unwrap();

    let (status, _) = get(addr, "/").await;
    assert!(status.contains("200"));

    // The second connection is accepted at the TCP level but dropped
    // by the gate before any HTTP exchange.
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    let mut buffer = Vec::new();
    let read = stream.read_to_end(&mut buffer).await;
    assert!(read.map(|n| n == 0).unwrap_or(true), "gated connection should close");

    w.stop().await;
}
