//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (request outcomes, cache events, commands, connections)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by outcome
//! - `proxy_cache_events_total` (counter): hit, miss, revalidated, replaced, evicted, stored
//! - `proxy_commands_total` (counter): operator commands by name
//! - `proxy_active_connections` (gauge): current connection count
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library users
//!   and tests pay nothing
//! - Labels are static strings; no per-host cardinality

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// How a client request was finally answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Forwarded,
    Cached,
    Blocked,
    BadRequest,
    NotImplemented,
    Command,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Forwarded => "forwarded",
            Outcome::Cached => "cached",
            Outcome::Blocked => "blocked",
            Outcome::BadRequest => "bad_request",
            Outcome::NotImplemented => "not_implemented",
            Outcome::Command => "command",
            Outcome::Failed => "failed",
        }
    }
}

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(outcome: Outcome) {
    metrics::counter!("proxy_requests_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_cache_event(event: &'static str) {
    metrics::counter!("proxy_cache_events_total", "event" => event).increment(1);
}

pub fn record_command(command: &'static str) {
    metrics::counter!("proxy_commands_total", "command" => command).increment(1);
}

pub fn record_active_connections(count: u64) {
    metrics::gauge!("proxy_active_connections").set(count as f64);
}
