//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, limits)
//! - Compile initial blocklist patterns up front
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.address must not be empty")]
    EmptyAddress,

    #[error("listener.port must not be 0")]
    ZeroPort,

    #[error("listener.max_connections must be at least 1 when set")]
    ZeroMaxConnections,

    #[error("limits.max_request_bytes must be at least 1")]
    ZeroRequestLimit,

    #[error("invalid blocklist pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid observability.metrics_address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.address.trim().is_empty() {
        errors.push(ValidationError::EmptyAddress);
    }
    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.listener.max_connections == Some(0) {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.limits.max_request_bytes == 0 {
        errors.push(ValidationError::ZeroRequestLimit);
    }

    for pattern in &config.proxy.blocklist {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(ValidationError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
