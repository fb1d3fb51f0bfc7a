// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The contract applications implement.

use crate::request::{DispatchInfo, IncomingRequest};
use crate::response::Response;
use async_trait::async_trait;
use thiserror::Error;

/// Errors escaping an application. The wrangler converts these into
/// 5xx responses; they never take the endpoint down.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Internal(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of asking an application to handle a request.
#[derive(Debug)]
pub enum HandlerResult {
    /// The application produced a response; dispatch ends.
    Handled(Response),
    /// Pass the request to the next (less-specific) mount.
    NotHandled,
}

/// A request handler bound into an endpoint's mount map.
///
/// Applications must not observably mutate the request; path
/// refinement is confined to the `dispatch` value (see
/// [`DispatchInfo::descend`]).
#[async_trait]
pub trait Application: Send + Sync {
    /// The configured application name.
    fn name(&self) -> &str;

    /// Handle one dispatched request.
    async fn handle_request(
        &self,
        request: &IncomingRequest,
        dispatch: DispatchInfo,
    ) -> Result<HandlerResult, AppError>;
}
