//! Shared runtime state.
//!
//! One `ProxyState` is created at startup and handed to every connection
//! task behind an `Arc`. The cache and the blocklist each guard their own
//! contents with their own lock; their enabled flags are lock-free.

use crate::cache::CacheStore;
use crate::config::ProxyStateConfig;
use crate::security::Blocklist;

/// Cache, blocklist and their operator toggles.
#[derive(Debug, Default)]
pub struct ProxyState {
    pub cache: CacheStore,
    pub blocklist: Blocklist,
}

impl ProxyState {
    /// Empty cache and blocklist, both disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the startup state from configuration.
    pub fn from_config(config: &ProxyStateConfig) -> Result<Self, regex::Error> {
        let state = Self {
            cache: CacheStore::new(),
            blocklist: Blocklist::with_patterns(&config.blocklist)?,
        };
        if config.caching_enabled {
            state.cache.enable();
        }
        if config.blocklisting_enabled {
            state.blocklist.enable();
        }
        Ok(state)
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    pub fn blocklisting_enabled(&self) -> bool {
        self.blocklist.is_enabled()
    }
}
