//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, optional connection limit)
//!     → connection.rs (id, lifecycle tracking, state machine)
//!     → framing.rs (read request until blank line)
//!     → Hand off to HTTP layer
//!
//! Outbound origin connection
//!     → framing.rs (read response until peer close)
//! ```
//!
//! # Design Decisions
//! - One task per connection, unbounded unless a limit is configured
//! - Each connection tracked for graceful shutdown
//! - Framing is direction-specific; no keep-alive, one request per connection

pub mod connection;
pub mod framing;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener};
