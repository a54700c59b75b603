//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (address, port, admission limit).
    pub listener: ListenerConfig,

    /// Startup values for the runtime toggles and the blocklist.
    pub proxy: ProxyStateConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to bind. Also the host that routes `/proxy/` commands.
    pub address: String,

    /// Port to bind.
    pub port: u16,

    /// Maximum concurrent connections. Unset means unbounded.
    pub max_connections: Option<usize>,
}

impl ListenerConfig {
    /// `address:port` as handed to the socket resolver.
    pub fn bind_address(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 2100,
            max_connections: None,
        }
    }
}

/// Initial state of the operator toggles.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyStateConfig {
    /// Serve and populate the response cache.
    pub caching_enabled: bool,

    /// Refuse destinations matching the blocklist.
    pub blocklisting_enabled: bool,

    /// Patterns loaded into the blocklist at startup.
    pub blocklist: Vec<String>,
}

/// Timeout configuration. Every timeout is optional; unset waits forever.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for the client to finish sending its request headers.
    pub client_read_secs: Option<u64>,

    /// Deadline for establishing the origin connection.
    pub origin_connect_secs: Option<u64>,

    /// Deadline for the origin to send its full response and close.
    pub origin_read_secs: Option<u64>,

    /// How long shutdown waits for in-flight connections.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            client_read_secs: None,
            origin_connect_secs: None,
            origin_read_secs: None,
            shutdown_grace_secs: 10,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest client request accepted before the header terminator.
    pub max_request_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: 64 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
