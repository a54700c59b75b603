//! TCP listener with optional admission control.
//!
//! # Responsibilities
//! - Resolve and bind the configured address and port
//! - Accept incoming TCP connections
//! - Enforce `max_connections` via semaphore when one is configured
//!
//! # Design Decisions
//! - Unbounded by default: every accepted connection gets its own task
//! - With a limit, the permit is taken before accepting so excess clients
//!   queue in the kernel backlog instead of in memory

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;
use crate::error::ListenerError;

/// A TCP listener that optionally limits concurrent connections.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections, if configured.
    connection_limit: Option<Arc<Semaphore>>,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr = config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ListenerError::bind(addr.clone(), e))?;

        Ok(Self::from_tcp(listener, config.max_connections))
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(listener: TcpListener, max_connections: Option<usize>) -> Self {
        if let Ok(local_addr) = listener.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections = ?max_connections,
                "Listener bound"
            );
        }

        Self {
            inner: listener,
            connection_limit: max_connections.map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    /// Accept a new connection, respecting the connection limit if any.
    ///
    /// The returned permit must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        let permit = match &self.connection_limit {
            // Never closed.
            Some(limit) => Arc::clone(limit).acquire_owned().await.ok(),
            None => None,
        };

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = ?self.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Free connection slots, or `None` when unbounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.connection_limit.as_ref().map(|s| s.available_permits())
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This ensures backpressure is maintained even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: Option<OwnedSemaphorePermit>,
}
