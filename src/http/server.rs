//! Accept loop and per-connection request handling.
//!
//! # Responsibilities
//! - Accept connections and spawn one task per connection
//! - Frame and parse the client request
//! - Dispatch: reject, run a command, check the blocklist, go through the
//!   cache or straight to the origin
//! - Reply and close, exactly once, on every path
//! - Stop accepting on shutdown and drain in-flight connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

use crate::admin;
use crate::cache::fetch_through_cache;
use crate::config::ProxyConfig;
use crate::error::{ListenerError, ProxyError};
use crate::http::request::{parse, ParsedRequest, RegularRequest};
use crate::http::response::StatusReply;
use crate::net::framing;
use crate::net::{ConnectionId, ConnectionState, ConnectionTracker, Listener};
use crate::observability::metrics::{self, Outcome};
use crate::resilience::{calculate_backoff, with_timeout};
use crate::state::ProxyState;
use crate::upstream::{build_request, Origin, TcpOrigin};

/// First pause after a failed accept; doubles per consecutive failure.
const ACCEPT_BACKOFF_BASE_MS: u64 = 10;
const ACCEPT_BACKOFF_MAX_MS: u64 = 1000;

/// Everything a connection task needs, shared across all of them.
#[derive(Debug)]
pub struct Handler<O> {
    config: Arc<ProxyConfig>,
    state: Arc<ProxyState>,
    origin: O,
}

impl<O: Origin> Handler<O> {
    pub fn new(config: Arc<ProxyConfig>, state: Arc<ProxyState>, origin: O) -> Self {
        Self {
            config,
            state,
            origin,
        }
    }

    /// Serve one connection from request to close.
    pub async fn handle<S>(&self, mut stream: S, id: ConnectionId)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut conn = Connection::new(id);

        match self.serve(&mut stream, &mut conn).await {
            Ok(outcome) => {
                metrics::record_request(outcome);
                tracing::debug!(connection_id = %id, outcome = outcome.as_str(), "Request complete");
            }
            Err(e) => {
                metrics::record_request(Outcome::Failed);
                tracing::warn!(connection_id = %id, state = ?conn.state, error = %e, "Connection failed");
            }
        }

        if let Err(e) = stream.shutdown().await {
            tracing::trace!(connection_id = %id, error = %e, "Error closing client stream");
        }
        conn.advance(ConnectionState::Closed);
    }

    async fn serve<S>(&self, stream: &mut S, conn: &mut Connection) -> Result<Outcome, ProxyError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let read = framing::read_request(stream, self.config.limits.max_request_bytes);
        let parsed = match with_timeout("client read", self.config.timeouts.client_read_secs, read).await {
            Ok(raw) => parse(&raw, &self.config.listener.address),
            Err(e) if e.is_malformed_request() => {
                tracing::debug!(connection_id = %conn.id, error = %e, "Unterminated request");
                ParsedRequest::BadRequest
            }
            Err(e) => return Err(e),
        };
        conn.advance(ConnectionState::Parsed);

        match parsed {
            ParsedRequest::NotImplemented => {
                conn.advance(ConnectionState::RejectedNotImpl);
                reply(stream, StatusReply::NotImplemented).await?;
                Ok(Outcome::NotImplemented)
            }
            ParsedRequest::BadRequest => {
                conn.advance(ConnectionState::RejectedBadReq);
                reply(stream, StatusReply::BadRequest).await?;
                Ok(Outcome::BadRequest)
            }
            ParsedRequest::Command { command_path } => {
                conn.advance(ConnectionState::Commanding);
                admin::execute(&command_path, &self.state);
                reply(stream, StatusReply::Ok).await?;
                Ok(Outcome::Command)
            }
            ParsedRequest::Regular(request) => {
                conn.advance(ConnectionState::Forwarding);
                self.forward(stream, conn, &request).await
            }
        }
    }

    async fn forward<S>(
        &self,
        stream: &mut S,
        conn: &Connection,
        request: &RegularRequest,
    ) -> Result<Outcome, ProxyError>
    where
        S: AsyncWrite + Unpin,
    {
        tracing::debug!(
            connection_id = %conn.id,
            host = %request.host,
            port = request.port,
            path = %request.path,
            "Forwarding request"
        );

        if self.state.blocklisting_enabled()
            && self.state.blocklist.is_blocked(&request.host, request.port)
        {
            tracing::info!(connection_id = %conn.id, destination = %request.destination(), "Blocked");
            reply(stream, StatusReply::Forbidden).await?;
            return Ok(Outcome::Blocked);
        }

        if self.state.caching_enabled() {
            let fetched = fetch_through_cache(&self.state.cache, &self.origin, request).await?;
            stream.write_all(&fetched.response).await?;
            stream.flush().await?;
            return Ok(if fetched.outcome.is_hit() {
                Outcome::Cached
            } else {
                Outcome::Forwarded
            });
        }

        let message = build_request(request, None);
        let response = self
            .origin
            .fetch(&request.host, request.port, &message)
            .await?;
        stream.write_all(&response).await?;
        stream.flush().await?;
        Ok(Outcome::Forwarded)
    }
}

async fn reply<S>(stream: &mut S, status: StatusReply) -> Result<(), ProxyError>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(status.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Per-connection state machine bookkeeping.
struct Connection {
    id: ConnectionId,
    state: ConnectionState,
}

impl Connection {
    fn new(id: ConnectionId) -> Self {
        Self {
            id,
            state: ConnectionState::Reading,
        }
    }

    fn advance(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(connection_id = %self.id, from = ?self.state, to = ?next, "Connection state");
        self.state = next;
    }
}

/// The forward proxy server.
pub struct ProxyServer {
    handler: Arc<Handler<TcpOrigin>>,
    tracker: ConnectionTracker,
    shutdown_grace: Duration,
}

impl ProxyServer {
    /// Create a server whose initial state comes from `config.proxy`.
    pub fn new(config: ProxyConfig) -> Result<Self, regex::Error> {
        let state = Arc::new(ProxyState::from_config(&config.proxy)?);
        Ok(Self::with_state(config, state))
    }

    /// Create a server around an existing shared state.
    pub fn with_state(config: ProxyConfig, state: Arc<ProxyState>) -> Self {
        let origin = TcpOrigin::new(&config.timeouts);
        let shutdown_grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
        Self {
            handler: Arc::new(Handler::new(Arc::new(config), state, origin)),
            tracker: ConnectionTracker::new(),
            shutdown_grace,
        }
    }

    /// Shared state handle, for inspection by the embedding program.
    pub fn state(&self) -> Arc<ProxyState> {
        Arc::clone(&self.handler.state)
    }

    /// Live connection tracker.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            address = ?listener.local_addr().ok(),
            caching = self.handler.state.caching_enabled(),
            blocklisting = self.handler.state.blocklisting_enabled(),
            "Proxy server starting"
        );

        let mut accept_errors = 0u32;
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        accept_errors = 0;
                        self.spawn_connection(stream, peer_addr, permit);
                    }
                    Err(e) => {
                        accept_errors = accept_errors.saturating_add(1);
                        let delay = calculate_backoff(accept_errors, ACCEPT_BACKOFF_BASE_MS, ACCEPT_BACKOFF_MAX_MS);
                        tracing::warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Accept failed");
                        tokio::time::sleep(delay).await;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        let active = self.tracker.active_count();
        if active > 0 {
            tracing::info!(active, grace_secs = self.shutdown_grace.as_secs(), "Draining connections");
            if !self.tracker.wait_for_idle(self.shutdown_grace).await {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain deadline passed, closing remaining connections"
                );
                self.tracker.cancel_all();
            }
        }

        tracing::info!("Proxy server stopped");
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: tokio::net::TcpStream,
        peer_addr: SocketAddr,
        permit: crate::net::ConnectionPermit,
    ) {
        let handler = Arc::clone(&self.handler);
        let tracker = self.tracker.clone();
        let guard = tracker.track();
        let id = guard.id();

        tracing::debug!(connection_id = %id, peer_addr = %peer_addr, "Connection opened");

        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;
            tokio::select! {
                _ = handler.handle(stream, id) => {}
                _ = tracker.cancelled() => {
                    tracing::debug!(connection_id = %id, "Connection cancelled by shutdown");
                }
            }
        });
    }
}
