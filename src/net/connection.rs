//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Name the states a connection passes through
//! - Count live connections so shutdown can drain them

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// States of a single connection. Every path ends in `Closed`, reached
/// exactly once.
///
/// ```text
/// Reading → Parsed → RejectedNotImpl ─┐
///                  → RejectedBadReq  ─┤
///                  → Commanding      ─┼→ Closed
///                  → Forwarding      ─┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Framing the client request.
    Reading,
    /// Request classified, not yet dispatched.
    Parsed,
    RejectedNotImpl,
    RejectedBadReq,
    /// Executing a `/proxy/` command.
    Commanding,
    /// Blocklist, cache and origin handling for a regular request.
    Forwarding,
    Closed,
}

impl ConnectionState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Reading, Parsed) => true,
            (Parsed, RejectedNotImpl | RejectedBadReq | Commanding | Forwarding) => true,
            _ => false,
        }
    }
}

/// Tracks active connections for graceful shutdown.
///
/// Uses a watch channel to tell in-flight connections to stop once the
/// drain deadline has passed.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug)]
struct TrackerInner {
    active_count: AtomicU64,
    idle: Notify,
    cancel: watch::Sender<bool>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            inner: Arc::new(TrackerInner {
                active_count: AtomicU64::new(0),
                idle: Notify::new(),
                cancel,
            }),
        }
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let count = self.inner.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_active_connections(count);
        ConnectionGuard {
            inner: Arc::clone(&self.inner),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.inner.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every tracked connection has closed or `grace` elapses.
    /// Returns `true` if the tracker drained.
    pub async fn wait_for_idle(&self, grace: Duration) -> bool {
        let drained = async {
            loop {
                let notified = self.inner.idle.notified();
                if self.active_count() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(grace, drained).await.is_ok()
    }

    /// Tell every connection still running to stop.
    pub fn cancel_all(&self) {
        self.inner.cancel.send_replace(true);
    }

    /// Resolves once [`cancel_all`](Self::cancel_all) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.inner.cancel.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    inner: Arc<TrackerInner>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.inner.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_active_connections(remaining);
        if remaining == 0 {
            self.inner.idle.notify_waiters();
        }
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
