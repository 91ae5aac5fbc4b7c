//! Runtime configuration
//!
//! Defaults are compiled in; `Config::from_env` overlays environment variables
//! and the CLI overlays its own flags on top of that.

use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheConfig;
use crate::data::currency::DEFAULT_RATES_URL;
use crate::data::drivers::DEFAULT_DRIVERS_BASE_URL;
use crate::data::market::MarketConfig;
use crate::data::DEFAULT_REQUEST_TIMEOUT;
use crate::rate_limit::MIN_REQUEST_INTERVAL;

pub const ACCESS_KEY_VAR: &str = "MARKETSTACK_ACCESS_KEY";
pub const BASE_URL_VAR: &str = "MARKETSTACK_BASE_URL";
pub const RATES_URL_VAR: &str = "EXCHANGE_RATE_URL";
pub const CACHE_HOURS_VAR: &str = "CACHE_DURATION_HOURS";
pub const DRIVERS_URL_VAR: &str = "ERGAST_BASE_URL";

/// Errors in user-supplied configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set to something that does not parse
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the composition root needs to build the clients
#[derive(Debug, Clone)]
pub struct Config {
    pub market: MarketConfig,
    /// USD-based exchange rate endpoint
    pub rates_url: String,
    /// Ergast-compatible F1 API base
    pub drivers_url: String,
    pub cache: CacheConfig,
    pub request_timeout: Duration,
    pub min_request_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            rates_url: DEFAULT_RATES_URL.to_string(),
            drivers_url: DEFAULT_DRIVERS_BASE_URL.to_string(),
            cache: CacheConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            min_request_interval: MIN_REQUEST_INTERVAL,
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(key) = get(ACCESS_KEY_VAR) {
            config.market.access_key = key;
        }
        if let Some(url) = get(BASE_URL_VAR) {
            config.market.base_url = url;
        }
        if let Some(url) = get(RATES_URL_VAR) {
            config.rates_url = url;
        }
        if let Some(url) = get(DRIVERS_URL_VAR) {
            config.drivers_url = url;
        }
        if let Some(hours) = get(CACHE_HOURS_VAR) {
            config.cache.expiration = parse_hours(&hours)?;
        }

        Ok(config)
    }
}

fn parse_hours(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        var: CACHE_HOURS_VAR,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let hours: u64 = value
        .trim()
        .parse()
        .map_err(|_| invalid("expected a whole number of hours"))?;
    if hours == 0 {
        return Err(invalid("must be at least 1"));
    }
    Ok(Duration::from_secs(hours * 60 * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.expiration, Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.min_request_interval, Duration::from_millis(200));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.market.access_key.is_empty());
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (ACCESS_KEY_VAR, "secret"),
            (BASE_URL_VAR, "http://localhost:9000/v1"),
            (CACHE_HOURS_VAR, "6"),
            (DRIVERS_URL_VAR, "http://localhost:9001/f1"),
        ]))
        .unwrap();

        assert_eq!(config.market.access_key, "secret");
        assert_eq!(config.market.base_url, "http://localhost:9000/v1");
        assert_eq!(config.cache.expiration, Duration::from_secs(6 * 60 * 60));
        assert_eq!(config.rates_url, DEFAULT_RATES_URL);
        assert_eq!(config.drivers_url, "http://localhost:9001/f1");
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = Config::from_lookup(lookup_from(&[(ACCESS_KEY_VAR, "  "), (CACHE_HOURS_VAR, "")]))
            .unwrap();
        assert!(config.market.access_key.is_empty());
        assert_eq!(config.cache.expiration, Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_invalid_cache_hours() {
        for bad in ["soon", "0", "-3"] {
            let result = Config::from_lookup(lookup_from(&[(CACHE_HOURS_VAR, bad)]));
            let err = result.unwrap_err();
            assert!(err.to_string().contains(CACHE_HOURS_VAR), "{}", err);
        }
    }
}
