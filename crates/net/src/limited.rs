// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limited stream wrapper.
//!
//! [`RateLimited`] wraps a duplex byte stream so outbound bytes flow
//! no faster than a token bucket allows. Reads pass through untouched.
//! Each write first obtains a grant in `[1, chunk_len]`, then hands
//! exactly the granted bytes to the inner stream; inner backpressure
//! is simply the inner stream's own pending state, observed before the
//! next grant is requested. A denied grant poisons the stream: the
//! pending write and every later one fail with the same
//! `rate-limit-<reason>` error.

use crate::bucket::{GrantResult, TokenBucket};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use sy_core::{Clock, SystemClock};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

type GrantFuture = Pin<Box<dyn Future<Output = GrantResult> + Send>>;

enum WriteState {
    Idle,
    /// A grant request is in flight.
    Granting(GrantFuture),
    /// Tokens granted for the next inner write.
    Granted(usize),
}

/// A duplex stream whose writes are metered by a token bucket.
pub struct RateLimited<S, C: Clock = SystemClock> {
    inner: S,
    bucket: TokenBucket<C>,
    state: WriteState,
    bytes_written: u64,
    /// First error observed; retained and re-raised for all later
    /// operations.
    broken: Option<String>,
}

impl<S, C: Clock> RateLimited<S, C> {
    pub fn new(inner: S, bucket: TokenBucket<C>) -> Self {
        Self {
            inner,
            bucket,
            state: WriteState::Idle,
            bytes_written: 0,
            broken: None,
        }
    }

    /// Total bytes successfully handed to the inner stream.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    fn broken_error(&self) -> Option<io::Error> {
        self.broken
            .as_ref()
            .map(|reason| io::Error::other(reason.clone()))
    }

    fn poison(&mut self, reason: String) -> io::Error {
        let error = io::Error::other(reason.clone());
        if self.broken.is_none() {
            self.broken = Some(reason);
        }
        error
    }
}

impl<S, C> AsyncWrite for RateLimited<S, C>
where
    S: AsyncWrite + Unpin,
    C: Clock,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Some(error) = this.broken_error() {
            return Poll::Ready(Err(error));
        }
        if buf.is_empty() {
            return Pin::new(&mut this.inner).poll_write(cx, buf);
        }

        loop {
            match &mut this.state {
                WriteState::Idle => {
                    let bucket = this.bucket.clone();
                    let max = buf.len() as f64;
                    this.state = WriteState::Granting(Box::pin(async move {
                        bucket.request_grant(1.0, max).await
                    }));
                }
                WriteState::Granting(future) => {
                    let result = match future.as_mut().poll(cx) {
                        Poll::Ready(result) => result,
                        Poll::Pending => return Poll::Pending,
                    };
                    if !result.done {
                        this.state = WriteState::Idle;
                        let reason = result
                            .reason
                            .map(|r| r.to_string())
                            .unwrap_or_else(|| "denied".to_string());
                        return Poll::Ready(Err(
                            this.poison(format!("rate-limit-{reason}"))
                        ));
                    }
                    this.state = WriteState::Granted(result.grant as usize);
                }
                WriteState::Granted(granted) => {
                    let len = (*granted).min(buf.len());
                    match Pin::new(&mut this.inner).poll_write(cx, &buf[..len]) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Ok(written)) => {
                            this.state = WriteState::Idle;
                            this.bytes_written += written as u64;
                            return Poll::Ready(Ok(written));
                        }
                        Poll::Ready(Err(error)) => {
                            this.state = WriteState::Idle;
                            return Poll::Ready(Err(
                                this.poison(error.to_string())
                            ));
                        }
                    }
                }
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(error) = this.broken_error() {
            return Poll::Ready(Err(error));
        }
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

impl<S, C> AsyncRead for RateLimited<S, C>
where
    S: AsyncRead + Unpin,
    C: Clock,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

#[cfg(test)]
#[path = "limited_tests.rs"]
mod tests;
