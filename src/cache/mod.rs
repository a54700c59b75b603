//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Regular request (caching enabled)
//!     → fetch.rs (lookup, conditional revalidation, store/evict)
//!     → store.rs (shared map, one RwLock)
//!     → upstream::origin (outbound fetch)
//! ```
//!
//! # Design Decisions
//! - Entries are the origin's raw bytes, replayed verbatim
//! - Freshness is decided by the origin (If-Modified-Since), never locally
//! - No expiry, no eviction policy; only failed revalidation and flush remove entries

pub mod fetch;
pub mod store;

pub use fetch::{fetch_through_cache, CacheFetch, CacheOutcome};
pub use store::{CacheStore, CachedResponse};
