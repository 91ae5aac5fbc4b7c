//! Cache module for storing API responses in the durable store
//!
//! This module provides a cache store that wraps values with a write timestamp and
//! schema version, expires them after a configurable duration, and keeps expired
//! entries readable through a stale read so the application can fall back to old
//! data when the APIs are unavailable.

mod store;

pub use store::{
    is_cache_key, CacheConfig, CacheStats, CacheStore, CachedData, CACHE_KEY_PREFIX,
    CACHE_SCHEMA_VERSION, DEFAULT_EXPIRATION, DEFAULT_FRESHNESS, STALE_KEY_PREFIX, VERSION_KEY,
};
