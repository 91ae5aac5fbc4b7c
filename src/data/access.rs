//! Cache-first, paced, stale-tolerant remote reads
//!
//! Every data client funnels its remote calls through `DataAccess`:
//! fresh cache hit → return; otherwise wait for the shared rate limiter, call the
//! API, write the result back; on failure serve whatever the cache still holds
//! for the key, however old, before giving up.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::fetch::{HttpFetch, MarketError};
use crate::cache::CacheStore;
use crate::rate_limit::RateLimiter;

/// Shared plumbing for the data clients
#[derive(Clone)]
pub struct DataAccess {
    cache: CacheStore,
    limiter: Arc<RateLimiter>,
    fetcher: Arc<dyn HttpFetch>,
}

impl std::fmt::Debug for DataAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccess")
            .field("cache", &self.cache)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl DataAccess {
    pub fn new(cache: CacheStore, limiter: Arc<RateLimiter>, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            cache,
            limiter,
            fetcher,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Issues one outbound request after waiting for the rate limiter
    pub async fn request(&self, url: &str, query: &[(&str, String)]) -> Result<Value, MarketError> {
        self.limiter.acquire().await;
        debug!(url, interval = ?self.limiter.min_interval(), "Issuing outbound request");
        self.fetcher.get_json(url, query).await
    }

    /// Serves `key` from the cache, or runs `fetch` and caches its result
    ///
    /// With `force_refresh` the fresh-cache check is skipped. If `fetch` fails,
    /// a stale entry for `key` is returned instead; only when none exists does
    /// the error reach the caller. `fetch` is expected to go through
    /// [`DataAccess::request`] so it is paced.
    pub async fn fetch_cached<T, F, Fut>(
        &self,
        key: &str,
        force_refresh: bool,
        fetch: F,
    ) -> Result<T, MarketError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, MarketError>>,
    {
        if !force_refresh {
            if let Some(cached) = self.cache.get::<T>(key).await {
                debug!(key, "Cache hit");
                return Ok(cached);
            }
            debug!(key, "Cache miss");
        }

        match fetch().await {
            Ok(value) => {
                self.cache.set(key, &value).await;
                Ok(value)
            }
            Err(error) => self.stale_fallback(key, error).await,
        }
    }

    /// Replaces a failed request with whatever the cache holds for `key`
    ///
    /// `NotFound` is returned unchanged when nothing is cached; every other
    /// failure is wrapped in `NoCacheAvailable`.
    pub async fn stale_fallback<T: DeserializeOwned>(
        &self,
        key: &str,
        error: MarketError,
    ) -> Result<T, MarketError> {
        if let Some(stale) = self.cache.get_stale::<T>(key).await {
            warn!(
                key,
                error = %error,
                cached_at = %stale.cached_at,
                "Request failed, serving cached data"
            );
            return Ok(stale.data);
        }

        warn!(key, error = %error, "Request failed and nothing is cached");
        match error {
            MarketError::NotFound(_) => Err(error),
            other => Err(MarketError::NoCacheAvailable {
                key: key.to_string(),
                source: Box::new(other),
            }),
        }
    }
}
