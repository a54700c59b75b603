//! Forward HTTP/1.0 proxy with caching, a destination blocklist and an
//! in-band `/proxy/` command channel.

pub mod admin;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod state;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::{ListenerError, ProxyError};
pub use http::ProxyServer;
pub use lifecycle::Shutdown;
pub use state::ProxyState;
