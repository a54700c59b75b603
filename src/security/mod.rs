//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed regular request:
//!     → blocklist.rs (destination host:port against operator patterns)
//!     → 403 on match, otherwise on to the cache / origin
//! ```
//!
//! # Design Decisions
//! - Checked only while blocklisting is enabled
//! - Patterns compiled once, when added
//! - Reads take a shared lock; command mutations take it exclusively

pub mod blocklist;

pub use blocklist::Blocklist;
