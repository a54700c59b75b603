//! Operator command channel.
//!
//! A GET whose target host is the proxy's own listen address and whose
//! path starts with `/proxy/` is routed here instead of being forwarded.

pub mod commands;

pub use commands::{execute, Command};
