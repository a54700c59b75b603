//! Shared response cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::observability::metrics;

/// A stored origin response, replayed byte for byte.
pub type CachedResponse = Arc<[u8]>;

/// Thread-safe map of `host:port/path` to the raw origin response.
///
/// Entries live until replaced, evicted by a failed revalidation, or
/// flushed. There is no expiry and no size bound.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<String, CachedResponse>>,
    /// Whether requests consult the cache at all. Read without locking.
    enabled: AtomicBool,
}

impl CacheStore {
    /// Create an empty, disabled cache.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Snapshot of the entry for `key`, if any. The lock is released
    /// before this returns.
    pub fn lookup(&self, key: &str) -> Option<CachedResponse> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Insert or replace the entry for `key`.
    pub fn store(&self, key: impl Into<String>, response: impl Into<CachedResponse>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.into(), response.into());
    }

    /// Remove the entry for `key`. Returns whether one existed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some();
        if removed {
            metrics::record_cache_event("evicted");
        }
        removed
    }

    /// Remove every entry.
    pub fn flush(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(entries = entries.len(), "Flushing cache");
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
