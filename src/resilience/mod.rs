//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Client request framing, origin connect, origin response framing:
//!     → timeouts.rs (optional deadline per operation)
//!
//! Accept loop errors (e.g. out of file descriptors):
//!     → backoff.rs (growing pause before the next accept)
//! ```
//!
//! # Design Decisions
//! - Deadlines are opt-in; with none configured an operation may wait forever
//! - No retries: a failed origin fetch fails that one client's request

pub mod backoff;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use timeouts::with_timeout;
