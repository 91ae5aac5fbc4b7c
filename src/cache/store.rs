//! Expiring cache over the durable key-value store
//!
//! Provides a `CacheStore` that wraps values with a write timestamp and a schema
//! version tag, treats old entries as misses on normal reads, and still hands
//! them out on stale reads so callers can degrade gracefully when the network
//! is unavailable.

use chrono::{DateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::storage::KvStore;

/// Prefix marking a store key as belonging to the cache namespace
pub const CACHE_KEY_PREFIX: &str = "cache:";

/// Prefix of expired entries kept only for stale reads
pub const STALE_KEY_PREFIX: &str = "cache-stale:";

/// Store key of the persisted schema version marker
pub const VERSION_KEY: &str = "@cache_version";

/// Schema version written with every entry by this build
pub const CACHE_SCHEMA_VERSION: &str = "1.0";

/// Default time after which an entry is expired (24 hours)
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default age under which an entry counts as fresh (1 hour)
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(60 * 60);

/// Raw record stored for every cache key
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The cached payload
    data: T,
    /// Write instant in milliseconds since the Unix epoch
    timestamp: i64,
    /// Schema version of the build that wrote the entry
    #[serde(rename = "schemaVersion")]
    schema_version: String,
}

/// Result of a stale read, including metadata about cache freshness
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the entry is past the expiration duration
    pub is_expired: bool,
}

/// Summary of the cache namespace
///
/// Live entries and retired copies (expired entries kept only for stale reads)
/// are reported separately; both are removed by `clear_all`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of live entries
    pub total_items: usize,
    /// Live entries past the expiration duration (or unreadable)
    pub expired_items: usize,
    /// Sum of the raw live record lengths in bytes
    pub total_size_bytes: usize,
    /// Number of retired copies
    pub retired_items: usize,
    /// Sum of the raw retired record lengths in bytes
    pub retired_size_bytes: usize,
}

/// Tuning for a `CacheStore`
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Age at which an entry stops being served by fresh reads
    pub expiration: Duration,
    /// Age under which `is_fresh` reports true
    pub freshness: Duration,
    /// Version tag written with every entry; a change wipes the namespace
    pub schema_version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiration: DEFAULT_EXPIRATION,
            freshness: DEFAULT_FRESHNESS,
            schema_version: CACHE_SCHEMA_VERSION.to_string(),
        }
    }
}

/// Namespaced, expiring memoization of JSON values
///
/// The cache is best-effort: storage failures are logged and turned into misses
/// or dropped writes, never returned to callers.
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KvStore>,
    config: CacheConfig,
    initialized: Arc<OnceCell<()>>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Creates a cache over `store`
    ///
    /// Call [`CacheStore::initialize`] before relying on the namespace contents.
    pub fn new(store: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            initialized: Arc::new(OnceCell::new()),
        }
    }

    /// The configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Reconciles the persisted version marker with this build's schema version
    ///
    /// On mismatch, every cache entry is removed and the new marker persisted.
    /// Runs at most once per `CacheStore` (clones share the flag).
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                let current = &self.config.schema_version;
                let stored = match self.store.get(VERSION_KEY).await {
                    Ok(stored) => stored,
                    Err(e) => {
                        warn!(error = %e, "Failed to read cache version marker");
                        return;
                    }
                };

                if stored.as_deref() == Some(current.as_str()) {
                    debug!(version = %current, "Cache version unchanged");
                    return;
                }

                self.clear_all().await;
                if let Err(e) = self.store.set(VERSION_KEY, current).await {
                    warn!(error = %e, "Failed to persist cache version marker");
                    return;
                }
                info!(
                    from = stored.as_deref().unwrap_or("none"),
                    to = %current,
                    "Cache cleared due to version change"
                );
            })
            .await;
    }

    /// Reads a non-expired value
    ///
    /// Returns `None` if the entry is absent, written under another schema
    /// version, or at least `expiration` old. Version-mismatched entries are
    /// deleted; expired entries are moved out of the live namespace so they no
    /// longer show up in fresh reads or stats but stay available to
    /// [`CacheStore::get_stale`].
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let (raw, entry) = self.read_entry(&live_key(key)).await?;

        if self.is_expired(entry.timestamp) {
            debug!(key, "Cache entry expired");
            self.retire(key, &raw).await;
            return None;
        }

        self.decode(key, entry.data)
    }

    /// Reads a value regardless of its age
    ///
    /// Used as the fallback when a live request fails. Looks at the live entry
    /// first, then at the retired copy left behind by an expired fresh read.
    /// Entries with another schema version are still treated as absent.
    pub async fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let (_, entry) = match self.read_entry(&live_key(key)).await {
            Some(found) => found,
            None => self.read_entry(&stale_key(key)).await?,
        };
        let is_expired = self.is_expired(entry.timestamp);
        let cached_at = Utc
            .timestamp_millis_opt(entry.timestamp)
            .single()
            .unwrap_or_default();

        Some(CachedData {
            data: self.decode(key, entry.data)?,
            cached_at,
            is_expired,
        })
    }

    /// Writes `value`, replacing any previous entry for `key`
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let entry = CacheEntry {
            data: value,
            timestamp: Utc::now().timestamp_millis(),
            schema_version: self.config.schema_version.clone(),
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.store.set(&live_key(key), &raw).await {
            warn!(key, error = %e, "Failed to write cache entry");
        }
    }

    /// Removes one entry unconditionally, including any retired copy
    pub async fn clear(&self, key: &str) {
        if let Err(e) = self.store.remove_many(&[live_key(key), stale_key(key)]).await {
            warn!(key, error = %e, "Failed to clear cache entry");
        }
    }

    /// Removes every entry in the cache namespace, live and retired
    ///
    /// Keys outside the namespace (auth session, settings, bookmarks) are kept.
    pub async fn clear_all(&self) {
        let keys = match self.keys_matching(is_cache_key).await {
            Some(keys) => keys,
            None => return,
        };

        let count = keys.len();
        match self.store.remove_many(&keys).await {
            Ok(()) => info!(count, "All cache cleared"),
            Err(e) => warn!(error = %e, "Failed to clear cache"),
        }
    }

    /// Counts live, expired and retired entries and their bytes without modifying anything
    pub async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        let keys = match self.keys_matching(is_cache_key).await {
            Some(keys) => keys,
            None => return stats,
        };

        for key in keys {
            let raw = match self.store.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key, error = %e, "Failed to read cache entry for stats");
                    continue;
                }
            };

            if key.starts_with(STALE_KEY_PREFIX) {
                stats.retired_items += 1;
                stats.retired_size_bytes += raw.len();
                continue;
            }

            stats.total_items += 1;
            stats.total_size_bytes += raw.len();

            match serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw) {
                Ok(entry) if !self.is_expired(entry.timestamp) => {}
                _ => stats.expired_items += 1,
            }
        }

        stats
    }

    /// Whether `key` holds an entry younger than the freshness threshold
    pub async fn is_fresh(&self, key: &str) -> bool {
        let raw = match self.store.get(&live_key(key)).await {
            Ok(Some(raw)) => raw,
            _ => return false,
        };

        match serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw) {
            Ok(entry) => {
                entry.schema_version == self.config.schema_version
                    && age_of(entry.timestamp) < self.config.freshness
            }
            Err(_) => false,
        }
    }

    /// Loads and validates the raw record at `store_key`
    async fn read_entry(&self, store_key: &str) -> Option<(String, CacheEntry<serde_json::Value>)> {
        let raw = match self.store.get(store_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = store_key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let entry: CacheEntry<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = store_key, error = %e, "Discarding unreadable cache entry");
                self.remove_quietly(store_key).await;
                return None;
            }
        };

        if entry.schema_version != self.config.schema_version {
            debug!(
                key = store_key,
                version = %entry.schema_version,
                "Discarding cache entry from another schema version"
            );
            self.remove_quietly(store_key).await;
            return None;
        }

        Some((raw, entry))
    }

    /// Moves an expired live record to its retired slot
    async fn retire(&self, key: &str, raw: &str) {
        if let Err(e) = self.store.set(&stale_key(key), raw).await {
            warn!(key, error = %e, "Failed to keep expired entry for fallback");
        }
        self.remove_quietly(&live_key(key)).await;
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, data: serde_json::Value) -> Option<T> {
        match serde_json::from_value(data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Cached payload has an unexpected shape");
                None
            }
        }
    }

    fn is_expired(&self, timestamp: i64) -> bool {
        age_of(timestamp) >= self.config.expiration
    }

    async fn keys_matching(&self, predicate: impl Fn(&str) -> bool) -> Option<Vec<String>> {
        match self.store.list_keys().await {
            Ok(keys) => Some(keys.into_iter().filter(|key| predicate(key.as_str())).collect()),
            Err(e) => {
                warn!(error = %e, "Failed to list cache keys");
                None
            }
        }
    }

    async fn remove_quietly(&self, store_key: &str) {
        if let Err(e) = self.store.remove(store_key).await {
            warn!(key = store_key, error = %e, "Failed to remove cache entry");
        }
    }
}

fn live_key(key: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, key)
}

fn stale_key(key: &str) -> String {
    format!("{}{}", STALE_KEY_PREFIX, key)
}

/// Whether a store key belongs to the cache (live or retired)
pub fn is_cache_key(key: &str) -> bool {
    key.starts_with(CACHE_KEY_PREFIX) || key.starts_with(STALE_KEY_PREFIX)
}

/// Age of an entry written at `timestamp` (ms); future timestamps count as zero
fn age_of(timestamp: i64) -> Duration {
    let elapsed = Utc::now().timestamp_millis().saturating_sub(timestamp);
    Duration::from_millis(elapsed.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::time::Duration as StdDuration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn test_data(name: &str, value: i32) -> TestData {
        TestData {
            name: name.to_string(),
            value,
        }
    }

    fn create_test_cache(expiration: StdDuration) -> (CacheStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheStore::new(
            store.clone(),
            CacheConfig {
                expiration,
                ..CacheConfig::default()
            },
        );
        (cache, store)
    }

    /// Store whose every operation fails
    struct BrokenStore;

    #[async_trait]
    impl KvStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }
        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }
        async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }
    }

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let (cache, _store) = create_test_cache(DEFAULT_EXPIRATION);
        let data = test_data("fresh", 100);

        cache.set("fresh_key", &data).await;

        assert_eq!(cache.get::<TestData>("fresh_key").await, Some(data));
    }

    #[tokio::test]
    async fn test_get_returns_none_for_missing_key() {
        let (cache, _store) = create_test_cache(DEFAULT_EXPIRATION);
        assert!(cache.get::<TestData>("nonexistent_key").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_are_written_under_namespace() {
        let (cache, store) = create_test_cache(DEFAULT_EXPIRATION);
        cache.set("stock_AAPL", &serde_json::json!({"close": 150})).await;

        let raw = store.get("cache:stock_AAPL").await.unwrap().expect("raw entry");
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["data"]["close"], 150);
        assert_eq!(parsed["schemaVersion"], CACHE_SCHEMA_VERSION);
        assert!(parsed["timestamp"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_entry() {
        let (cache, _store) = create_test_cache(DEFAULT_EXPIRATION);
        cache.set("k", &test_data("first", 1)).await;
        cache.set("k", &test_data("second", 2)).await;

        assert_eq!(cache.get::<TestData>("k").await, Some(test_data("second", 2)));
    }

    #[tokio::test]
    async fn test_clear_removes_entry() {
        let (cache, _store) = create_test_cache(DEFAULT_EXPIRATION);
        cache.set("k", &test_data("x", 1)).await;

        cache.clear("k").await;

        assert!(cache.get::<TestData>("k").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_leaves_live_namespace_on_fresh_read() {
        let (cache, store) = create_test_cache(StdDuration::from_millis(20));
        let data = test_data("expired", 0);
        cache.set("expired_key", &data).await;

        tokio::time::sleep(StdDuration::from_millis(40)).await;

        assert!(cache.get::<TestData>("expired_key").await.is_none());
        assert!(store.get("cache:expired_key").await.unwrap().is_none());
        // Expiry is not reversed by reading again
        assert!(cache.get::<TestData>("expired_key").await.is_none());
        assert_eq!(cache.stats().await.total_items, 0);

        // The retired copy still serves stale reads
        let stale = cache.get_stale::<TestData>("expired_key").await.unwrap();
        assert_eq!(stale.data, data);
        assert!(stale.is_expired);
    }

    #[tokio::test]
    async fn test_clear_removes_retired_copy() {
        let (cache, _store) = create_test_cache(StdDuration::ZERO);
        cache.set("k", &test_data("x", 1)).await;
        assert!(cache.get::<TestData>("k").await.is_none());

        cache.clear("k").await;

        assert!(cache.get_stale::<TestData>("k").await.is_none());
    }

    #[tokio::test]
    async fn test_new_write_after_expiry_is_served_again() {
        let (cache, _store) = create_test_cache(StdDuration::from_millis(20));
        cache.set("k", &test_data("old", 1)).await;
        tokio::time::sleep(StdDuration::from_millis(40)).await;
        assert!(cache.get::<TestData>("k").await.is_none());

        cache.set("k", &test_data("new", 2)).await;

        assert_eq!(cache.get::<TestData>("k").await, Some(test_data("new", 2)));
        assert_eq!(cache.get_stale::<TestData>("k").await.unwrap().data, test_data("new", 2));
    }

    #[tokio::test]
    async fn test_zero_expiration_expires_immediately() {
        let (cache, _store) = create_test_cache(StdDuration::ZERO);
        cache.set("k", &test_data("x", 1)).await;
        assert!(cache.get::<TestData>("k").await.is_none());
    }

    #[tokio::test]
    async fn test_stale_read_returns_expired_entry() {
        let (cache, _store) = create_test_cache(StdDuration::from_millis(20));
        let data = test_data("stale", 7);
        let before = Utc::now();
        cache.set("stale_key", &data).await;

        tokio::time::sleep(StdDuration::from_millis(40)).await;

        let cached = cache
            .get_stale::<TestData>("stale_key")
            .await
            .expect("stale read should ignore expiry");
        assert_eq!(cached.data, data);
        assert!(cached.is_expired);
        assert!(cached.cached_at >= before - chrono::Duration::milliseconds(1));
    }

    #[tokio::test]
    async fn test_stale_read_of_fresh_entry_is_not_expired() {
        let (cache, _store) = create_test_cache(DEFAULT_EXPIRATION);
        cache.set("k", &test_data("x", 1)).await;

        let cached = cache.get_stale::<TestData>("k").await.unwrap();
        assert!(!cached.is_expired);
    }

    #[tokio::test]
    async fn test_schema_version_mismatch_deletes_entry() {
        let store = Arc::new(MemoryStore::new());
        let old = CacheStore::new(
            store.clone(),
            CacheConfig {
                schema_version: "0.9".to_string(),
                ..CacheConfig::default()
            },
        );
        old.set("k", &test_data("old", 1)).await;

        let current = CacheStore::new(store.clone(), CacheConfig::default());
        assert!(current.get_stale::<TestData>("k").await.is_none());
        assert!(store.get("cache:k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_record_is_discarded() {
        let (cache, store) = create_test_cache(DEFAULT_EXPIRATION);
        store.set("cache:broken", "not json").await.unwrap();

        assert!(cache.get::<TestData>("broken").await.is_none());
        assert!(store.get("cache:broken").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_payload_shape_is_a_miss() {
        let (cache, _store) = create_test_cache(DEFAULT_EXPIRATION);
        cache.set("k", &"just a string").await;
        assert!(cache.get::<TestData>("k").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_all_preserves_other_namespaces() {
        let (cache, store) = create_test_cache(DEFAULT_EXPIRATION);
        cache.set("stock_AAPL", &test_data("a", 1)).await;
        cache.set("search_tesla", &test_data("b", 2)).await;
        store.set("theme_user123", "dark").await.unwrap();
        store.set("@auth_state", "user123").await.unwrap();
        store.set("bookmarkedStocks_user123", "[\"AAPL\"]").await.unwrap();

        cache.clear_all().await;

        assert!(cache.get::<TestData>("stock_AAPL").await.is_none());
        assert!(cache.get::<TestData>("search_tesla").await.is_none());
        assert_eq!(store.get("theme_user123").await.unwrap().as_deref(), Some("dark"));
        assert_eq!(store.get("@auth_state").await.unwrap().as_deref(), Some("user123"));
        assert!(store.get("bookmarkedStocks_user123").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats_counts_without_deleting() {
        let (cache, store) = create_test_cache(StdDuration::from_millis(20));
        cache.set("old", &test_data("old", 1)).await;
        tokio::time::sleep(StdDuration::from_millis(40)).await;
        store.set("cache:garbage", "xyz").await.unwrap();
        store.set("theme_user1", "light").await.unwrap();

        let stats = cache.stats().await;

        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.expired_items, 2);
        let old_len = store.get("cache:old").await.unwrap().unwrap().len();
        assert_eq!(stats.total_size_bytes, old_len + "xyz".len());
        assert!(store.get("cache:old").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats_reports_retired_copies_separately() {
        let (cache, store) = create_test_cache(StdDuration::from_millis(20));
        cache.set("old", &test_data("old", 1)).await;
        let raw_len = store.get("cache:old").await.unwrap().unwrap().len();
        tokio::time::sleep(StdDuration::from_millis(40)).await;
        assert!(cache.get::<TestData>("old").await.is_none());
        cache.set("new", &test_data("new", 2)).await;

        let stats = cache.stats().await;

        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.expired_items, 0);
        assert_eq!(stats.retired_items, 1);
        assert_eq!(stats.retired_size_bytes, raw_len);

        cache.clear_all().await;
        assert_eq!(cache.stats().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_stats_on_empty_cache() {
        let (cache, _store) = create_test_cache(DEFAULT_EXPIRATION);
        assert_eq!(cache.stats().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_is_fresh_uses_freshness_threshold() {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheStore::new(
            store,
            CacheConfig {
                freshness: StdDuration::from_millis(20),
                ..CacheConfig::default()
            },
        );
        cache.set("k", &test_data("x", 1)).await;
        assert!(cache.is_fresh("k").await);

        tokio::time::sleep(StdDuration::from_millis(40)).await;

        assert!(!cache.is_fresh("k").await);
        // Still usable: freshness is stricter than expiration
        assert!(cache.get::<TestData>("k").await.is_some());
        assert!(!cache.is_fresh("missing").await);
    }

    #[tokio::test]
    async fn test_initialize_wipes_cache_on_version_bump() {
        let store = Arc::new(MemoryStore::new());
        let v1 = CacheStore::new(store.clone(), CacheConfig::default());
        v1.initialize().await;
        v1.set("stock_AAPL", &test_data("a", 1)).await;
        store.set("cache-stale:stock_MSFT", "{}").await.unwrap();
        store.set("theme_user123", "dark").await.unwrap();

        let v2 = CacheStore::new(
            store.clone(),
            CacheConfig {
                schema_version: "2.0".to_string(),
                ..CacheConfig::default()
            },
        );
        v2.initialize().await;

        assert!(v2.get::<TestData>("stock_AAPL").await.is_none());
        let keys = store.list_keys().await.unwrap();
        assert!(keys.iter().all(|k| !is_cache_key(k)));
        assert_eq!(store.get(VERSION_KEY).await.unwrap().as_deref(), Some("2.0"));
        assert_eq!(store.get("theme_user123").await.unwrap().as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn test_initialize_keeps_cache_when_version_matches() {
        let store = Arc::new(MemoryStore::new());
        let first = CacheStore::new(store.clone(), CacheConfig::default());
        first.initialize().await;
        first.set("k", &test_data("kept", 1)).await;

        let second = CacheStore::new(store, CacheConfig::default());
        second.initialize().await;

        assert_eq!(second.get::<TestData>("k").await, Some(test_data("kept", 1)));
    }

    #[tokio::test]
    async fn test_initialize_runs_once_per_instance() {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheStore::new(store.clone(), CacheConfig::default());
        cache.initialize().await;

        // A foreign marker written later is not reconciled again
        store.set(VERSION_KEY, "other").await.unwrap();
        cache.set("k", &test_data("x", 1)).await;
        cache.clone().initialize().await;

        assert!(cache.get::<TestData>("k").await.is_some());
    }

    #[tokio::test]
    async fn test_broken_storage_degrades_to_misses() {
        let cache = CacheStore::new(Arc::new(BrokenStore), CacheConfig::default());

        cache.initialize().await;
        cache.set("k", &test_data("x", 1)).await;
        cache.clear("k").await;
        cache.clear_all().await;

        assert!(cache.get::<TestData>("k").await.is_none());
        assert!(cache.get_stale::<TestData>("k").await.is_none());
        assert!(!cache.is_fresh("k").await);
        assert_eq!(cache.stats().await, CacheStats::default());
    }
}
