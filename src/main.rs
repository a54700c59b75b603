//! Forward HTTP/1.0 proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                FORWARD PROXY                  │
//!                      │                                               │
//!   Client Request     │  ┌─────────┐   ┌─────────┐   ┌────────────┐  │
//!   ───────────────────┼─▶│   net   │──▶│  http   │──▶│  security  │  │
//!                      │  │listener │   │ parser  │   │ blocklist  │  │
//!                      │  └─────────┘   └────┬────┘   └─────┬──────┘  │
//!                      │                     │ /proxy/      │         │
//!                      │                     ▼              ▼         │
//!                      │               ┌─────────┐   ┌────────────┐  │
//!                      │               │  admin  │   │   cache    │  │
//!                      │               │commands │   │ + revalid. │  │
//!                      │               └─────────┘   └─────┬──────┘  │
//!                      │                                   ▼         │
//!   Client Response    │                             ┌────────────┐  │
//!   ◀──────────────────┼─────────────────────────────│  upstream  │◀─┼──── Origin
//!                      │                             │   origin   │  │     Server
//!                      │                             └────────────┘  │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use forward_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use forward_proxy::lifecycle::{wait_for_signal, Shutdown};
use forward_proxy::net::Listener;
use forward_proxy::observability::{init_logging, metrics};
use forward_proxy::ProxyServer;

#[derive(Parser, Debug)]
#[command(name = "forward-proxy")]
#[command(about = "Forward HTTP/1.0 proxy with caching and a destination blocklist", long_about = None)]
struct Cli {
    /// Address to listen on; also the host that receives /proxy/ commands.
    #[arg(short, long)]
    address: Option<String>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start with caching enabled.
    #[arg(long)]
    cache: bool,

    /// Start with blocklisting enabled.
    #[arg(long)]
    blocklist: bool,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(address) = self.address {
            config.listener.address = address;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if self.cache {
            config.proxy.caching_enabled = true;
        }
        if self.blocklist {
            config.proxy.blocklisting_enabled = true;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    init_logging(&config.observability)?;

    tracing::info!(
        address = %config.listener.address,
        port = config.listener.port,
        max_connections = ?config.listener.max_connections,
        caching = config.proxy.caching_enabled,
        blocklisting = config.proxy.blocklisting_enabled,
        blocklist_patterns = config.proxy.blocklist.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated above.
        let addr: std::net::SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener).await?;
    let server = ProxyServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
