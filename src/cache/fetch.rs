//! Cache-aware origin fetch with conditional revalidation.
//!
//! # Flow
//! ```text
//! key = host:port/path
//! entry cached with Last-Modified?
//!     yes → conditional GET (If-Modified-Since)
//!             304 → replay stored entry, cache untouched
//!             200 → replace entry, relay fresh response
//!             other → evict entry, relay fresh response
//!     no  → plain GET
//!             200 → store, relay
//!             other → relay only
//! ```
//!
//! The cache lock is never held across the origin round trip, so two
//! connections revalidating the same key may race; the last store wins.

use crate::cache::store::{CacheStore, CachedResponse};
use crate::error::ProxyError;
use crate::http::request::RegularRequest;
use crate::http::response::{last_modified, OriginStatus};
use crate::observability::metrics;
use crate::upstream::origin::{build_request, Origin};

/// What the cache did for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Origin answered 304; the stored entry was replayed.
    Revalidated,
    /// Origin answered 200 to the conditional GET; the entry was replaced.
    Replaced,
    /// Origin answered something else to the conditional GET; the entry was dropped.
    Evicted,
    /// Miss, origin answered 200; the response was stored.
    Stored,
    /// Miss, origin answered something else; nothing was stored.
    Uncached,
}

impl CacheOutcome {
    /// Whether the client is served the previously stored bytes.
    pub fn is_hit(self) -> bool {
        matches!(self, CacheOutcome::Revalidated)
    }
}

/// Response bytes to relay to the client, plus what happened to the cache.
#[derive(Debug, Clone)]
pub struct CacheFetch {
    pub response: CachedResponse,
    pub outcome: CacheOutcome,
}

/// Serve `request` through `cache`, consulting `origin` as needed.
pub async fn fetch_through_cache<O: Origin>(
    cache: &CacheStore,
    origin: &O,
    request: &RegularRequest,
) -> Result<CacheFetch, ProxyError> {
    let key = request.cache_key();

    if let Some(stored) = cache.lookup(&key) {
        match last_modified(&stored) {
            Some(date) => return revalidate(cache, origin, request, key, stored, &date).await,
            None => {
                tracing::debug!(key = %key, "Cached entry has no Last-Modified; refetching");
            }
        }
    }

    metrics::record_cache_event("miss");
    let message = build_request(request, None);
    let response = origin
        .fetch(&request.host, request.port, &message)
        .await?;
    let response: CachedResponse = response.into();

    let outcome = if OriginStatus::of(&response) == OriginStatus::Ok {
        cache.store(key.clone(), response.clone());
        metrics::record_cache_event("stored");
        CacheOutcome::Stored
    } else {
        CacheOutcome::Uncached
    };
    tracing::debug!(key = %key, outcome = ?outcome, "Cache miss served");

    Ok(CacheFetch { response, outcome })
}

async fn revalidate<O: Origin>(
    cache: &CacheStore,
    origin: &O,
    request: &RegularRequest,
    key: String,
    stored: CachedResponse,
    date: &str,
) -> Result<CacheFetch, ProxyError> {
    metrics::record_cache_event("revalidated");
    let message = build_request(request, Some(date));
    let response = origin
        .fetch(&request.host, request.port, &message)
        .await?;

    let (response, outcome) = match OriginStatus::of(&response) {
        OriginStatus::NotModified => {
            metrics::record_cache_event("hit");
            (stored, CacheOutcome::Revalidated)
        }
        OriginStatus::Ok => {
            let fresh: CachedResponse = response.into();
            cache.store(key.clone(), fresh.clone());
            metrics::record_cache_event("replaced");
            (fresh, CacheOutcome::Replaced)
        }
        OriginStatus::Other => {
            cache.delete(&key);
            (response.into(), CacheOutcome::Evicted)
        }
    };
    tracing::debug!(key = %key, outcome = ?outcome, "Cache entry revalidated");

    Ok(CacheFetch { response, outcome })
}
