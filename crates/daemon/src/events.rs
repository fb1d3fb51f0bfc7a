// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Promise-chained event log.
//!
//! An [`EventSource`] emits immutable events forming a singly-linked
//! chain; each event's `next` resolves exactly once, when the
//! successor is emitted. The source retains strong references to the
//! latest `keep_count + 1` events; everything earlier is reachable
//! only through the chain and collects once consumers move on.
//! [`EventSink`] consumes a chain in FIFO order with a serial
//! handler; [`EventTracker`] advances over a chain with a predicate.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use sy_core::{LogRecord, LogSink};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One immutable event in a chain.
pub struct ChainedEvent<T> {
    payload: T,
    next: Mutex<Option<Arc<ChainedEvent<T>>>>,
    emitted: Notify,
}

impl<T> ChainedEvent<T> {
    fn new(payload: T) -> Arc<Self> {
        Arc::new(Self {
            payload,
            next: Mutex::new(None),
            emitted: Notify::new(),
        })
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// The successor, if it has been emitted.
    pub fn next_now(&self) -> Option<Arc<ChainedEvent<T>>> {
        self.next.lock().clone()
    }

    /// Await the successor. Once resolved it never changes.
    pub async fn next(&self) -> Arc<ChainedEvent<T>> {
        loop {
            let notified = self.emitted.notified();
            if let Some(next) = self.next_now() {
                return next;
            }
            notified.await;
        }
    }

    fn resolve_next(&self, next: Arc<ChainedEvent<T>>) {
        let mut slot = self.next.lock();
        debug_assert!(slot.is_none(), "next resolves exactly once");
        *slot = Some(next);
        drop(slot);
        self.emitted.notify_waiters();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ChainedEvent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedEvent")
            .field("payload", &self.payload)
            .field("has_next", &self.next_now().is_some())
            .finish()
    }
}

struct SourceInner<T> {
    newest: Option<Arc<ChainedEvent<T>>>,
    kept: VecDeque<Arc<ChainedEvent<T>>>,
}

struct SourceShared<T> {
    inner: Mutex<SourceInner<T>>,
    first_emitted: Notify,
    keep_count: usize,
}

/// An event producer. Clones share the chain.
pub struct EventSource<T> {
    shared: Arc<SourceShared<T>>,
}

impl<T> Clone for EventSource<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T> std::fmt::Debug for EventSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("EventSource")
            .field("kept", &inner.kept.len())
            .field("keep_count", &self.shared.keep_count)
            .finish()
    }
}

impl<T: Send + Sync + 'static> EventSource<T> {
    /// A source retaining the latest `keep_count + 1` events.
    pub fn new(keep_count: usize) -> Self {
        Self {
            shared: Arc::new(SourceShared {
                inner: Mutex::new(SourceInner { newest: None, kept: VecDeque::new() }),
                first_emitted: Notify::new(),
                keep_count,
            }),
        }
    }

    /// Emit an event. Non-blocking: appends to the chain, resolves the
    /// predecessor's `next`, and trims retention.
    pub fn emit(&self, payload: T) -> Arc<ChainedEvent<T>> {
        let event = ChainedEvent::new(payload);
        let mut inner = self.shared.inner.lock();
        if let Some(previous) = inner.newest.replace(Arc::clone(&event)) {
            previous.resolve_next(Arc::clone(&event));
        }
        inner.kept.push_back(Arc::clone(&event));
        while inner.kept.len() > self.shared.keep_count + 1 {
            inner.kept.pop_front();
        }
        drop(inner);
        self.shared.first_emitted.notify_waiters();
        event
    }

    /// The most recent event, if any.
    pub fn current_now(&self) -> Option<Arc<ChainedEvent<T>>> {
        self.shared.inner.lock().newest.clone()
    }

    /// The oldest event still retained.
    pub fn earliest_now(&self) -> Option<Arc<ChainedEvent<T>>> {
        self.shared.inner.lock().kept.front().cloned()
    }

    /// The most recent event, waiting for the first emission if the
    /// chain is still empty.
    pub async fn current(&self) -> Arc<ChainedEvent<T>> {
        loop {
            let notified = self.shared.first_emitted.notified();
            if let Some(event) = self.current_now() {
                return event;
            }
            notified.await;
        }
    }

    /// The oldest retained event, waiting for the first emission if
    /// the chain is still empty.
    pub async fn earliest(&self) -> Arc<ChainedEvent<T>> {
        loop {
            let notified = self.shared.first_emitted.notified();
            if let Some(event) = self.earliest_now() {
                return event;
            }
            notified.await;
        }
    }
}

/// A serial consumer of an event chain.
///
/// The handler runs at most once per event, in emission order. `stop`
/// halts after the current event; `drain_and_stop` first processes
/// everything already emitted.
pub struct EventSink {
    cancel: CancellationToken,
    drain: CancellationToken,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

impl EventSink {
    /// Spawn a sink over `source`, starting from the oldest retained
    /// event (or the first future emission when the chain is empty).
    pub fn spawn<T, F>(source: &EventSource<T>, mut handler: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnMut(&T) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let drain = CancellationToken::new();
        let source = source.clone();
        let task_cancel = cancel.clone();
        let task_drain = drain.clone();

        let handle = tokio::spawn(async move {
            let mut head = source.earliest_now();
            loop {
                let event = match head.take() {
                    Some(event) => event,
                    None => {
                        let waited = tokio::select! {
                            _ = task_cancel.cancelled() => {
                                if task_drain.is_cancelled() {
                                    source.earliest_now()
                                } else {
                                    None
                                }
                            }
                            event = source.earliest() => Some(event),
                        };
                        match waited {
                            Some(event) => event,
                            None => break,
                        }
                    }
                };
                handler(event.payload());

                head = if task_drain.is_cancelled() {
                    // Draining: consume only what is already emitted.
                    match event.next_now() {
                        Some(next) => Some(next),
                        None => break,
                    }
                } else {
                    tokio::select! {
                        _ = task_cancel.cancelled() => {
                            if task_drain.is_cancelled() {
                                match event.next_now() {
                                    Some(next) => Some(next),
                                    None => break,
                                }
                            } else {
                                break;
                            }
                        }
                        next = event.next() => Some(next),
                    }
                };
            }
        });

        Self { cancel, drain, handle }
    }

    /// Process already-emitted events, then halt.
    pub async fn drain_and_stop(self) {
        self.drain.cancel();
        self.cancel.cancel();
        if self.handle.await.is_err() {
            tracing::warn!("event sink task panicked");
        }
    }

    /// Halt after the in-flight handler call.
    pub async fn stop(self) {
        self.cancel.cancel();
        if self.handle.await.is_err() {
            tracing::warn!("event sink task panicked");
        }
    }
}

/// A cursor over an event chain with synchronous advancement.
pub struct EventTracker<T> {
    head: Option<Arc<ChainedEvent<T>>>,
}

impl<T> EventTracker<T> {
    pub fn new(start: Option<Arc<ChainedEvent<T>>>) -> Self {
        Self { head: start }
    }

    /// The event the tracker currently points at.
    pub fn head(&self) -> Option<&Arc<ChainedEvent<T>>> {
        self.head.as_ref()
    }

    /// Advance over already-emitted events while `predicate` holds,
    /// returning the last event that matched. Used to skip past "the
    /// last event of kind X" when resuming a log across reload.
    pub fn advance_while(
        &mut self,
        predicate: impl Fn(&T) -> bool,
    ) -> Option<Arc<ChainedEvent<T>>> {
        let mut last = None;
        while let Some(event) = &self.head {
            if !predicate(event.payload()) {
                break;
            }
            last = Some(Arc::clone(event));
            self.head = event.next_now();
        }
        last
    }
}

/// Adapter: a [`LogSink`] that pushes records into an event chain so
/// the system-logger service can consume them.
#[derive(Debug, Clone)]
pub struct ChainLogSink {
    source: EventSource<LogRecord>,
}

impl ChainLogSink {
    pub fn new(keep_count: usize) -> Self {
        Self { source: EventSource::new(keep_count) }
    }

    pub fn source(&self) -> &EventSource<LogRecord> {
        &self.source
    }
}

impl LogSink for ChainLogSink {
    fn record(&self, record: LogRecord) {
        self.source.emit(record);
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
