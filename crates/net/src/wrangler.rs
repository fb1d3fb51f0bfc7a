// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-endpoint protocol wrangler.
//!
//! Owns the listening socket and turns raw bytes into dispatched
//! requests: accept loop, optional connection gating and outbound
//! rate limiting, TLS with SNI for secure protocols, HTTP/1.1 and
//! HTTP/2 via hyper, and graceful stop (close the listener, let
//! in-flight requests finish within the grace period, then force).

use crate::application::{AppError, HandlerResult};
use crate::bucket::TokenBucket;
use crate::endpoint::EndpointRouter;
use crate::hosts::HostManager;
use crate::limited::RateLimited;
use crate::request::IncomingRequest;
use crate::response;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::StatusCode;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use parking_lot::Mutex;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sy_config::Protocol;
use sy_core::TagLogger;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Errors from wrangler setup and lifecycle.
#[derive(Debug, Error)]
pub enum WranglerError {
    #[error("cannot bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("wrangler is already running")]
    AlreadyRunning,

    #[error("protocol {0} requires host certificates but none are configured")]
    MissingHosts(Protocol),
}

/// Static configuration for one wrangler.
#[derive(Debug, Clone)]
pub struct WranglerConfig {
    /// Endpoint name, used as the log tag.
    pub name: String,
    /// `address:port` to bind.
    pub bind_address: String,
    pub protocol: Protocol,
    /// How long `stop` waits for in-flight requests.
    pub stop_grace: Duration,
}

/// The dispatch surface the wrangler drives; implemented by
/// [`EndpointRouter`] and by test stubs.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: &IncomingRequest) -> Result<HandlerResult, AppError>;
}

#[async_trait]
impl RequestHandler for EndpointRouter {
    async fn handle(&self, request: &IncomingRequest) -> Result<HandlerResult, AppError> {
        self.dispatch(request).await
    }
}

/// One completed request, as reported to the request-logger service.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub endpoint: String,
    /// Remote `address:port`.
    pub origin: String,
    pub protocol: Protocol,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_length: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration: Duration,
    /// Error identifiers when the backend failed or the request was
    /// malformed; empty on success.
    pub error_codes: Vec<String>,
    pub request_info: serde_json::Value,
    pub response_info: serde_json::Value,
}

/// Receiver for completed-request events.
pub trait RequestEventSink: Send + Sync {
    fn on_request(&self, event: &RequestEvent);
}

/// Cross-cutting services attached to a wrangler.
#[derive(Clone, Default)]
pub struct WranglerServices {
    /// Gate on accepting connections (one token per accept).
    pub connection_bucket: Option<TokenBucket>,
    /// Meter on outbound bytes; wraps each connection's stream.
    pub data_bucket: Option<TokenBucket>,
    /// Request-completion events.
    pub request_sink: Option<Arc<dyn RequestEventSink>>,
}

/// Shared state for the accept loop and its connection tasks.
struct ConnShared {
    endpoint: String,
    protocol: Protocol,
    default_port: u16,
    stop_grace: Duration,
    handler: Arc<dyn RequestHandler>,
    tls: Option<TlsAcceptor>,
    services: WranglerServices,
    logger: TagLogger,
    cancel: CancellationToken,
}

struct Running {
    cancel: CancellationToken,
    tracker: TaskTracker,
    accept_task: tokio::task::JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Accept loop, TLS termination, and HTTP serving for one endpoint.
pub struct ProtocolWrangler {
    config: WranglerConfig,
    handler: Arc<dyn RequestHandler>,
    tls_config: Option<Arc<rustls::ServerConfig>>,
    services: WranglerServices,
    logger: TagLogger,
    running: Mutex<Option<Running>>,
}

impl ProtocolWrangler {
    /// Construct a wrangler. Secure protocols require a host manager
    /// with at least one certificate.
    pub fn new(
        config: WranglerConfig,
        handler: Arc<dyn RequestHandler>,
        hosts: Option<&Arc<HostManager>>,
        services: WranglerServices,
        logger: TagLogger,
    ) -> Result<Self, WranglerError> {
        let tls_config = if config.protocol.is_secure() {
            let hosts = hosts
                .filter(|manager| !manager.is_empty())
                .ok_or(WranglerError::MissingHosts(config.protocol))?;
            Some(Arc::new(hosts.server_config(config.protocol)))
        } else {
            None
        };
        Ok(Self {
            config,
            handler,
            tls_config,
            services,
            logger,
            running: Mutex::new(None),
        })
    }

    /// Bind the listener and start accepting. Returns the bound
    /// address (useful with ephemeral ports).
    pub async fn start(&self) -> Result<SocketAddr, WranglerError> {
        if self.running.lock().is_some() {
            return Err(WranglerError::AlreadyRunning);
        }

        let listener = TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|source| WranglerError::Bind {
                address: self.config.bind_address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| WranglerError::Bind {
            address: self.config.bind_address.clone(),
            source,
        })?;

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let shared = Arc::new(ConnShared {
            endpoint: self.config.name.clone(),
            protocol: self.config.protocol,
            default_port: local_addr.port(),
            stop_grace: self.config.stop_grace,
            handler: Arc::clone(&self.handler),
            tls: self.tls_config.clone().map(TlsAcceptor::from),
            services: self.services.clone(),
            logger: self.logger.clone(),
            cancel: cancel.clone(),
        });

        self.logger.emit(
            "listening",
            json!({
                "address": local_addr.to_string(),
                "protocol": self.config.protocol.to_string(),
            }),
        );

        let accept_task = tokio::spawn(accept_loop(listener, shared, tracker.clone()));

        *self.running.lock() = Some(Running { cancel, tracker, accept_task, local_addr });
        Ok(local_addr)
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.local_addr)
    }

    /// Close the listener, let in-flight requests finish within the
    /// grace period, then force-close. Does not return until the
    /// socket is closed and connection tasks are drained.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            tracing::debug!(endpoint = %self.config.name, "stop on idle wrangler");
            return;
        };

        running.cancel.cancel();
        if running.accept_task.await.is_err() {
            tracing::warn!(endpoint = %self.config.name, "accept task panicked");
        }

        running.tracker.close();
        let drain_limit = self.config.stop_grace + Duration::from_secs(1);
        if tokio::time::timeout(drain_limit, running.tracker.wait())
            .await
            .is_err()
        {
            self.logger.emit("stop-drain-timeout", json!({}));
        }
        self.logger.emit("stopped", json!({}));
    }
}

async fn accept_loop(
    listener: TcpListener,
    shared: Arc<ConnShared>,
    tracker: TaskTracker,
) {
    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if let Some(bucket) = &shared.services.connection_bucket {
                        if bucket.take_now(1.0, 1.0).grant < 1.0 {
                            shared.logger.emit(
                                "connection-refused",
                                json!({ "origin": peer.to_string(), "reason": "rate-limit" }),
                            );
                            continue;
                        }
                    }
                    let shared = Arc::clone(&shared);
                    tracker.spawn(handle_connection(stream, peer, shared));
                }
                Err(error) => {
                    tracing::error!(endpoint = %shared.endpoint, %error, "accept error");
                }
            }
        }
    }
    // Dropping the listener here closes the socket; no new
    // connections from this point on.
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, shared: Arc<ConnShared>) {
    let conn_id = nanoid::nanoid!(8);
    let logger = shared.logger.sub(format!("conn-{conn_id}"));
    logger.emit("connected", json!({ "origin": peer.to_string() }));

    let data_bucket = shared.services.data_bucket.clone();
    match (shared.tls.clone(), data_bucket) {
        (None, None) => serve_io(stream, peer, &logger, &shared).await,
        (None, Some(bucket)) => {
            serve_io(RateLimited::new(stream, bucket), peer, &logger, &shared).await;
        }
        (Some(acceptor), None) => match acceptor.accept(stream).await {
            Ok(tls) => serve_io(tls, peer, &logger, &shared).await,
            Err(error) => {
                logger.emit(
                    "tls-handshake-failed",
                    json!({ "origin": peer.to_string(), "error": error.to_string() }),
                );
            }
        },
        (Some(acceptor), Some(bucket)) => {
            match acceptor.accept(RateLimited::new(stream, bucket)).await {
                Ok(tls) => serve_io(tls, peer, &logger, &shared).await,
                Err(error) => {
                    logger.emit(
                        "tls-handshake-failed",
                        json!({ "origin": peer.to_string(), "error": error.to_string() }),
                    );
                }
            }
        }
    }

    logger.emit("disconnected", json!({ "origin": peer.to_string() }));
}

async fn serve_io<S>(io: S, peer: SocketAddr, logger: &TagLogger, shared: &Arc<ConnShared>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = hyper::service::service_fn({
        let shared = Arc::clone(shared);
        let logger = logger.clone();
        move |req: hyper::Request<Incoming>| {
            let shared = Arc::clone(&shared);
            let logger = logger.clone();
            async move {
                Ok::<_, Infallible>(handle_request(req, peer, &logger, &shared).await)
            }
        }
    });

    let mut builder = auto::Builder::new(TokioExecutor::new());
    if shared.protocol != Protocol::Http2 {
        builder = builder.http1_only();
    }
    let conn = builder.serve_connection_with_upgrades(TokioIo::new(io), service);
    let mut conn = std::pin::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(error) = result {
                logger.emit("connection-error", json!({ "error": error.to_string() }));
            }
        }
        _ = shared.cancel.cancelled() => {
            // Refuse new requests on this connection; in-flight ones
            // get the grace period to finish.
            conn.as_mut().graceful_shutdown();
            if tokio::time::timeout(shared.stop_grace, conn.as_mut()).await.is_err() {
                logger.emit("connection-force-closed", json!({}));
            }
        }
    }
}

async fn handle_request(
    req: hyper::Request<Incoming>,
    peer: SocketAddr,
    logger: &TagLogger,
    shared: &Arc<ConnShared>,
) -> response::Response {
    let started_at = Utc::now();
    let started = Instant::now();
    let (parts, _body) = req.into_parts();
    let method = parts.method.to_string();

    let (incoming, outcome) = match IncomingRequest::new(
        parts.method,
        &parts.uri,
        parts.headers,
        shared.default_port,
        logger,
    ) {
        Ok(incoming) => {
            incoming
                .logger()
                .emit("request-started", incoming.info_for_log());
            let outcome = shared.handler.handle(&incoming).await;
            (Some(incoming), outcome)
        }
        Err(error) => {
            logger.emit("bad-request", json!({ "error": error.to_string() }));
            (None, Err(AppError::Internal(error.to_string())))
        }
    };

    let (resp, error_codes) = match outcome {
        Ok(HandlerResult::Handled(resp)) => (resp, Vec::new()),
        Ok(HandlerResult::NotHandled) => (response::not_found(), Vec::new()),
        Err(error) => {
            let status = match &incoming {
                Some(request) => {
                    request
                        .logger()
                        .emit("backend-error", json!({ "error": error.to_string() }));
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                None => StatusCode::BAD_REQUEST,
            };
            (response::html_status(status), vec![error.to_string()])
        }
    };

    if let Some(sink) = &shared.services.request_sink {
        let content_length = resp
            .headers()
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let url = incoming
            .as_ref()
            .map(|r| r.url())
            .unwrap_or_else(|| parts.uri.to_string());
        let event = RequestEvent {
            endpoint: shared.endpoint.clone(),
            origin: peer.to_string(),
            protocol: shared.protocol,
            method,
            url,
            status: resp.status().as_u16(),
            content_length,
            started_at,
            ended_at: Utc::now(),
            duration: started.elapsed(),
            error_codes,
            request_info: incoming
                .as_ref()
                .map(|r| r.info_for_log())
                .unwrap_or(serde_json::Value::Null),
            response_info: response::info_for_log(&resp, content_length),
        };
        sink.on_request(&event);
    }

    resp
}

#[cfg(test)]
#[path = "wrangler_tests.rs"]
mod tests;
