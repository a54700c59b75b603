//! Origin server access.
//!
//! One short-lived TCP connection per fetch: connect, write the request,
//! read until the origin closes.

pub mod origin;

pub use origin::{build_request, Origin, TcpOrigin};
