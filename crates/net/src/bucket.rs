// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-bucket rate limiter.
//!
//! A bucket holds up to `burst_size` tokens and refills continuously
//! at `flow_rate` tokens per second. Immediate grants come from
//! [`TokenBucket::take_now`]; [`TokenBucket::request_grant`] queues a
//! FIFO waiter when tokens are short. A single servicing task sleeps
//! until the head waiter's minimum can be covered, so there is one
//! wakeup per token-arrival window rather than per waiter.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sy_core::{Clock, SystemClock};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from bucket construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketError {
    #[error("burst_size must be positive")]
    InvalidBurstSize,

    #[error("flow_rate must be positive")]
    InvalidFlowRate,

    #[error("max_grant_size must be in (0, burst_size]")]
    InvalidMaxGrantSize,

    #[error("initial_burst must be in [0, burst_size]")]
    InvalidInitialBurst,
}

/// Why a grant request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The waiter queue was full when the request arrived.
    TooManyWaiters,
    /// The bucket denied all queued requests, normally at shutdown.
    Shutdown,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DenyReason::TooManyWaiters => "too-many-waiters",
            DenyReason::Shutdown => "shutdown",
        })
    }
}

/// Outcome of a grant operation.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantResult {
    /// Whether the operation ran to completion (denials set `false`).
    pub done: bool,
    /// Tokens granted; `0.0` when nothing was granted.
    pub grant: f64,
    /// Time spent queued; zero for immediate grants.
    pub wait_time: Duration,
    /// Set when the request was denied.
    pub reason: Option<DenyReason>,
}

impl GrantResult {
    fn immediate(grant: f64) -> Self {
        Self { done: true, grant, wait_time: Duration::ZERO, reason: None }
    }

    fn denied(reason: DenyReason, wait_time: Duration) -> Self {
        Self { done: false, grant: 0.0, wait_time, reason: Some(reason) }
    }
}

/// Bucket configuration.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    /// Maximum tokens the bucket can hold. Must be positive.
    pub burst_size: f64,
    /// Refill rate in tokens per second. Must be positive.
    pub flow_rate: f64,
    /// Largest single grant; defaults to `burst_size`.
    pub max_grant_size: Option<f64>,
    /// Waiter-queue bound; `None` is unbounded.
    pub max_waiters: Option<usize>,
    /// Whether grants may be fractional.
    pub partial_tokens: bool,
    /// Tokens available at construction; defaults to `burst_size`.
    pub initial_burst: Option<f64>,
}

impl BucketConfig {
    pub fn new(burst_size: f64, flow_rate: f64) -> Self {
        Self {
            burst_size,
            flow_rate,
            max_grant_size: None,
            max_waiters: None,
            partial_tokens: false,
            initial_burst: None,
        }
    }
}

/// Point-in-time view of bucket state.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSnapshot {
    /// Tokens currently available.
    pub available_burst: f64,
    /// Queued waiters.
    pub waiters: usize,
    /// When the snapshot was taken.
    pub at: Instant,
}

struct Waiter {
    min: f64,
    max: f64,
    enqueued_at: Instant,
    tx: oneshot::Sender<GrantResult>,
}

struct BucketState {
    available: f64,
    last_refill_at: Instant,
    waiters: VecDeque<Waiter>,
    /// Whether the servicing task is alive.
    servicing: bool,
}

struct Shared<C: Clock> {
    state: Mutex<BucketState>,
    clock: C,
    burst_size: f64,
    flow_rate: f64,
    max_grant_size: f64,
    max_waiters: Option<usize>,
    partial_tokens: bool,
}

/// A shareable token bucket. Clones refer to the same bucket.
pub struct TokenBucket<C: Clock = SystemClock> {
    shared: Arc<Shared<C>>,
}

impl<C: Clock> Clone for TokenBucket<C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<C: Clock> std::fmt::Debug for TokenBucket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TokenBucket")
            .field("burst_size", &self.shared.burst_size)
            .field("flow_rate", &self.shared.flow_rate)
            .field("available", &state.available)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

impl TokenBucket<SystemClock> {
    pub fn new(config: BucketConfig) -> Result<Self, BucketError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> TokenBucket<C> {
    pub fn with_clock(config: BucketConfig, clock: C) -> Result<Self, BucketError> {
        if !(config.burst_size > 0.0) {
            return Err(BucketError::InvalidBurstSize);
        }
        if !(config.flow_rate > 0.0) {
            return Err(BucketError::InvalidFlowRate);
        }
        let mut max_grant_size = config.max_grant_size.unwrap_or(config.burst_size);
        if !config.partial_tokens {
            // Whole-token buckets can only grant integers.
            max_grant_size = max_grant_size.floor();
        }
        if !(max_grant_size > 0.0) || max_grant_size > config.burst_size {
            return Err(BucketError::InvalidMaxGrantSize);
        }
        let initial_burst = config.initial_burst.unwrap_or(config.burst_size);
        if !(0.0..=config.burst_size).contains(&initial_burst) {
            return Err(BucketError::InvalidInitialBurst);
        }

        let state = BucketState {
            available: initial_burst,
            last_refill_at: clock.now(),
            waiters: VecDeque::new(),
            servicing: false,
        };
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                clock,
                burst_size: config.burst_size,
                flow_rate: config.flow_rate,
                max_grant_size,
                max_waiters: config.max_waiters,
                partial_tokens: config.partial_tokens,
            }),
        })
    }

    /// Largest single grant this bucket will make.
    pub fn max_grant_size(&self) -> f64 {
        self.shared.max_grant_size
    }

    /// Try to grant between `min` and `max` tokens immediately.
    ///
    /// Grants `min(max, max_grant_size, available)`; if that falls
    /// short of `min`, grants nothing. Never waits.
    pub fn take_now(&self, min: f64, max: f64) -> GrantResult {
        let mut state = self.shared.state.lock();
        self.shared.refill(&mut state);
        // Queued waiters go first; an immediate taker may not jump
        // ahead of them.
        if !state.waiters.is_empty() {
            return GrantResult::immediate(0.0);
        }
        let grant = self.shared.compute_grant(&state, min, max);
        state.available -= grant;
        GrantResult::immediate(grant)
    }

    /// Grant between `min` and `max` tokens, waiting for refill when
    /// tokens are short.
    ///
    /// Waiters are strictly FIFO. Returns a denied result when the
    /// waiter queue is full or [`TokenBucket::deny_all_requests`]
    /// sweeps the queue.
    pub async fn request_grant(&self, min: f64, max: f64) -> GrantResult {
        let rx = {
            let mut state = self.shared.state.lock();
            self.shared.refill(&mut state);

            if state.waiters.is_empty() {
                let grant = self.shared.compute_grant(&state, min, max);
                if grant >= min.min(self.shared.max_grant_size) && grant > 0.0 {
                    state.available -= grant;
                    return GrantResult::immediate(grant);
                }
            }

            if let Some(limit) = self.shared.max_waiters {
                if state.waiters.len() >= limit {
                    return GrantResult::denied(DenyReason::TooManyWaiters, Duration::ZERO);
                }
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(Waiter {
                min,
                max,
                enqueued_at: self.shared.clock.now(),
                tx,
            });
            if !state.servicing {
                state.servicing = true;
                let shared = Arc::clone(&self.shared);
                tokio::spawn(service_waiters(shared));
            }
            rx
        };

        match rx.await {
            Ok(result) => result,
            // The bucket was dropped with the waiter still queued.
            Err(_) => GrantResult::denied(DenyReason::Shutdown, Duration::ZERO),
        }
    }

    /// Deny every queued waiter with `reason`. The bucket remains
    /// usable afterwards.
    pub fn deny_all_requests(&self, reason: DenyReason) {
        let waiters = {
            let mut state = self.shared.state.lock();
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            let wait_time = self.shared.clock.since(waiter.enqueued_at);
            let _ = waiter.tx.send(GrantResult::denied(reason, wait_time));
        }
    }

    /// Atomic view of availability and queue depth.
    pub fn snapshot_now(&self) -> BucketSnapshot {
        let mut state = self.shared.state.lock();
        self.shared.refill(&mut state);
        BucketSnapshot {
            available_burst: state.available,
            waiters: state.waiters.len(),
            at: state.last_refill_at,
        }
    }
}

impl<C: Clock> Shared<C> {
    /// Credit tokens for time elapsed since the last refill.
    fn refill(&self, state: &mut BucketState) {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(state.last_refill_at);
        state.available =
            (state.available + elapsed.as_secs_f64() * self.flow_rate).min(self.burst_size);
        state.last_refill_at = now;
    }

    /// Largest grant satisfying `min..=max` from current availability,
    /// or `0.0` when `min` cannot be covered.
    fn compute_grant(&self, state: &BucketState, min: f64, max: f64) -> f64 {
        let min = min.min(self.max_grant_size);
        let mut grant = max.min(self.max_grant_size).min(state.available);
        if !self.partial_tokens {
            grant = grant.floor();
        }
        if grant < min || grant <= 0.0 {
            return 0.0;
        }
        grant
    }
}

/// Servicing task: satisfy the head waiter as soon as its minimum can
/// be covered, strictly in FIFO order. Exits when the queue drains.
async fn service_waiters<C: Clock>(shared: Arc<Shared<C>>) {
    loop {
        let sleep_for = {
            let mut state = shared.state.lock();
            shared.refill(&mut state);

            loop {
                let Some(head) = state.waiters.front() else {
                    state.servicing = false;
                    return;
                };
                let target = {
                    let min = head.min.min(shared.max_grant_size);
                    if shared.partial_tokens {
                        min.max(f64::MIN_POSITIVE)
                    } else {
                        min.ceil().max(1.0)
                    }
                };
                if state.available >= target {
                    let Some(head) = state.waiters.pop_front() else {
                        state.servicing = false;
                        return;
                    };
                    let grant = shared.compute_grant(&state, head.min, head.max);
                    state.available -= grant;
                    let wait_time = shared.clock.since(head.enqueued_at);
                    let _ = head.tx.send(GrantResult {
                        done: true,
                        grant,
                        wait_time,
                        reason: None,
                    });
                    continue;
                }
                let shortfall = target - state.available;
                break Duration::from_secs_f64(shortfall / shared.flow_rate);
            }
        };
        tokio::time::sleep(sleep_for).await;
    }
}

#[cfg(test)]
#[path = "bucket_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "bucket_property_tests.rs"]
mod property_tests;
