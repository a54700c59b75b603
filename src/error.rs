//! Per-connection error taxonomy.
//!
//! Client-facing rejections (400, 403, 501) are not errors: they are
//! classifications produced by the parser and the blocklist guard. What
//! remains here are the I/O failures that end a single connection.

use thiserror::Error;

/// Errors that terminate the handling of one connection.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Reading from or writing to a socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The origin server could not be reached.
    #[error("failed to connect to origin {addr}: {source}")]
    OriginConnect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A configured deadline expired.
    #[error("{0} timed out after {1} seconds")]
    Timeout(&'static str, u64),

    /// The client closed its side before the header terminator arrived.
    #[error("client closed the connection before the request was complete")]
    ClientClosed,

    /// The client request grew past the configured limit.
    #[error("request exceeded {0} bytes without a header terminator")]
    RequestTooLarge(usize),
}

impl ProxyError {
    /// Whether the failure happened while framing the client request,
    /// in which case the client is still owed a 400 reply.
    pub fn is_malformed_request(&self) -> bool {
        matches!(self, ProxyError::ClientClosed | ProxyError::RequestTooLarge(_))
    }
}

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to resolve or bind the configured address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to accept a connection.
    #[error("failed to accept: {0}")]
    Accept(#[source] std::io::Error),
}

impl ListenerError {
    pub(crate) fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        ListenerError::Bind {
            addr: addr.into(),
            source,
        }
    }
}
