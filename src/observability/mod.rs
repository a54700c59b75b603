//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, connection id on every line)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (human-readable or JSON)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
