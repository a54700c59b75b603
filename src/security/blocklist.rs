//! Destination blocklist.
//!
//! Patterns are regular expressions searched (not anchored) against the
//! request destination `host:port`, so a pattern matching any part of it
//! blocks the request.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// Thread-safe set of blocked destination patterns.
#[derive(Debug, Default)]
pub struct Blocklist {
    /// Pattern source text -> compiled expression.
    patterns: RwLock<BTreeMap<String, Regex>>,
    /// Whether requests are checked at all. Read without locking.
    enabled: AtomicBool,
}

impl Blocklist {
    /// Create an empty, disabled blocklist.
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

    /// Create a blocklist holding `patterns`. Fails on the first invalid one.
    pub fn with_patterns<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocklist = Self::new();
        for pattern in patterns {
            blocklist.add(pattern.as_ref())?;
        }
        Ok(blocklist)
    }

    /// Add a pattern. Returns `false` if it was already present.
    pub fn add(&self, pattern: &str) -> Result<bool, regex::Error> {
        let regex = Regex::new(pattern)?;
        let mut patterns = self.patterns.write().unwrap_or_else(PoisonError::into_inner);
        Ok(patterns.insert(pattern.to_string(), regex).is_none())
    }

    /// Remove a pattern if present. Returns whether anything was removed.
    pub fn remove(&self, pattern: &str) -> bool {
        let mut patterns = self.patterns.write().unwrap_or_else(PoisonError::into_inner);
        patterns.remove(pattern).is_some()
    }

    /// Remove every pattern.
    pub fn flush(&self) {
        self.patterns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Whether any pattern matches `host:port`.
    pub fn is_blocked(&self, host: &str, port: u16) -> bool {
        let destination = format!("{}:{}", host, port);
        let patterns = self.patterns.read().unwrap_or_else(PoisonError::into_inner);
        patterns.values().any(|regex| regex.is_match(&destination))
    }

    /// Snapshot of the pattern sources, sorted.
    pub fn patterns(&self) -> Vec<String> {
        self.patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
