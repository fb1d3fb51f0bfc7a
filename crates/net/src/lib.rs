// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sy-net: The request-serving subsystem.
//!
//! Everything between the listening socket and an application's
//! `handle_request`: the token bucket and the rate-limited stream
//! wrapper, the host/certificate manager with SNI, the per-endpoint
//! protocol wrangler (accept loop, TLS, HTTP/1.1 + HTTP/2), the
//! host+path router, the request/response model, and the built-in
//! applications.

pub mod application;
pub mod apps;
pub mod bucket;
pub mod endpoint;
pub mod etag;
pub mod hosts;
pub mod limited;
pub mod request;
pub mod response;
pub mod wrangler;

pub use application::{AppError, Application, HandlerResult};
pub use bucket::{BucketConfig, BucketSnapshot, DenyReason, GrantResult, TokenBucket};
pub use endpoint::EndpointRouter;
pub use hosts::{HostManager, HostsError};
pub use limited::RateLimited;
pub use request::{DispatchInfo, IncomingRequest};
pub use response::{Body, Response};
pub use wrangler::{
    ProtocolWrangler, RequestEvent, RequestEventSink, RequestHandler, WranglerConfig,
    WranglerError, WranglerServices,
};
