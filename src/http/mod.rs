//! HTTP/1.0 handling over raw sockets.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → net::framing (read until blank line)
//!     → request.rs (classify: regular, command, 400, 501)
//!     → server.rs (blocklist → cache → origin, or command)
//!     → response.rs (status replies, origin status inspection)
//!     → Send to client, close
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{parse, Headers, ParsedRequest, RegularRequest};
pub use response::{OriginStatus, StatusReply};
pub use server::{Handler, ProxyServer};
