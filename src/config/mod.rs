//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → command-line overrides (main.rs)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc with the server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no runtime reload
//! - All fields have defaults to allow minimal configs
//! - Runtime toggles (caching, blocklisting) live in `ProxyState`, not here;
//!   the config only supplies their startup values

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    LimitsConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, ProxyStateConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
