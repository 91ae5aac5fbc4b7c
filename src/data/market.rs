//! Market-data API client
//!
//! Fetches quotes, ticker search results, end-of-day history and the exchange
//! listing from a Marketstack-style REST API. Responses are JSON with either a
//! `data` array or an `error` object.

use chrono::{Duration, Utc};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::access::DataAccess;
use super::fetch::MarketError;
use super::{Exchange, HistoricalPrice, Stock, Ticker};

/// Base URL of the market-data API
pub const DEFAULT_MARKET_BASE_URL: &str = "https://api.marketstack.com/v1";

/// Symbols shown on the home list
pub const POPULAR_SYMBOLS: &[&str] = &["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NVDA", "NFLX"];

/// Maximum number of search results requested
const SEARCH_LIMIT: usize = 10;

/// Connection settings for the market-data API
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Base URL, without trailing endpoint
    pub base_url: String,
    /// Access credential sent as the `access_key` query parameter
    pub access_key: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MARKET_BASE_URL.to_string(),
            access_key: String::new(),
        }
    }
}

/// `{"data": [...]}` or `{"error": {...}}`
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: Option<Vec<T>>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Client for the market-data API
#[derive(Debug, Clone)]
pub struct MarketClient {
    access: DataAccess,
    config: MarketConfig,
}

impl MarketClient {
    pub fn new(access: DataAccess, config: MarketConfig) -> Self {
        Self { access, config }
    }

    /// Cache key of a single quote
    pub fn stock_key(symbol: &str) -> String {
        format!("stock_{}", normalize_symbol(symbol))
    }

    /// Cache key of a search query
    pub fn search_key(query: &str) -> String {
        format!("search_{}", query.trim().to_lowercase())
    }

    /// Cache key of a price history window
    pub fn historical_key(symbol: &str, days: u32) -> String {
        format!("historical_{}_{}", normalize_symbol(symbol), days)
    }

    /// Fetches the latest quote for `symbol`
    ///
    /// # Returns
    /// * `Ok(Stock)` - from the cache, the API, or a stale cache entry if the API failed
    /// * `Err(MarketError::NotFound)` - the API knows no such symbol and nothing is cached
    /// * `Err(MarketError::NoCacheAvailable)` - the request failed and nothing is cached
    pub async fn get_stock_price(&self, symbol: &str, force_refresh: bool) -> Result<Stock, MarketError> {
        let symbol = normalize_symbol(symbol);
        let key = Self::stock_key(&symbol);

        self.access
            .fetch_cached(&key, force_refresh, || self.fetch_quote(&symbol))
            .await
    }

    /// Fetches the latest quotes for several symbols with at most one request
    ///
    /// Cached symbols are served individually; the rest are requested together.
    /// Symbols missing from the response (or all of them, if the request fails)
    /// fall back to stale cache entries one by one. The result follows the
    /// order of `symbols`, skipping duplicates and symbols with no data at all.
    pub async fn get_multiple_stocks<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<Stock> {
        let mut requested: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = normalize_symbol(symbol.as_ref());
            if !symbol.is_empty() && !requested.contains(&symbol) {
                requested.push(symbol);
            }
        }

        let cache = self.access.cache();
        let cached = join_all(
            requested
                .iter()
                .map(|symbol| async move { cache.get::<Stock>(&Self::stock_key(symbol)).await }),
        )
        .await;

        let mut found: HashMap<String, Stock> = HashMap::new();
        let mut missing = Vec::new();
        for (symbol, hit) in requested.iter().zip(cached) {
            match hit {
                Some(stock) => {
                    found.insert(symbol.clone(), stock);
                }
                None => missing.push(symbol.clone()),
            }
        }
        debug!(cached = found.len(), missing = missing.len(), "Batch quote lookup");

        if !missing.is_empty() {
            match self.request_latest(&missing).await {
                Ok(stocks) => {
                    for stock in stocks {
                        let symbol = normalize_symbol(&stock.symbol);
                        if missing.contains(&symbol) && !found.contains_key(&symbol) {
                            cache.set(&Self::stock_key(&symbol), &stock).await;
                            found.insert(symbol, stock);
                        }
                    }
                }
                Err(e) => warn!(error = %e, symbols = ?missing, "Batch quote request failed"),
            }

            for symbol in &missing {
                if found.contains_key(symbol) {
                    continue;
                }
                match cache.get_stale::<Stock>(&Self::stock_key(symbol)).await {
                    Some(stale) => {
                        warn!(symbol = %symbol, cached_at = %stale.cached_at, "Serving cached quote");
                        found.insert(symbol.clone(), stale.data);
                    }
                    None => warn!(symbol = %symbol, "No quote available, omitting"),
                }
            }
        }

        requested
            .into_iter()
            .filter_map(|symbol| found.remove(&symbol))
            .collect()
    }

    /// Fetches quotes for [`POPULAR_SYMBOLS`]
    pub async fn get_popular_stocks(&self) -> Vec<Stock> {
        self.get_multiple_stocks(POPULAR_SYMBOLS).await
    }

    /// Searches tickers by symbol or company name
    ///
    /// A blank query returns no results without touching the cache or the API.
    pub async fn search_stocks(&self, query: &str, force_refresh: bool) -> Result<Vec<Ticker>, MarketError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let key = Self::search_key(query);
        self.access
            .fetch_cached(&key, force_refresh, || self.fetch_search(query))
            .await
    }

    /// Fetches end-of-day prices for the last `days` days, newest first
    ///
    /// `days == 0` returns an empty series without touching the API.
    pub async fn get_historical_data(
        &self,
        symbol: &str,
        days: u32,
        force_refresh: bool,
    ) -> Result<Vec<HistoricalPrice>, MarketError> {
        if days == 0 {
            return Ok(Vec::new());
        }

        let symbol = normalize_symbol(symbol);
        let key = Self::historical_key(&symbol, days);

        self.access
            .fetch_cached(&key, force_refresh, || self.fetch_history(&symbol, days))
            .await
    }

    /// Fetches the exchange listing
    pub async fn get_exchanges(&self, force_refresh: bool) -> Result<Vec<Exchange>, MarketError> {
        self.access
            .fetch_cached("exchanges", force_refresh, || self.fetch_exchanges())
            .await
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Stock, MarketError> {
        self.request_latest(&[symbol.to_string()])
            .await?
            .into_iter()
            .find(|stock| normalize_symbol(&stock.symbol) == symbol)
            .ok_or_else(|| MarketError::NotFound(symbol.to_string()))
    }

    async fn fetch_search(&self, query: &str) -> Result<Vec<Ticker>, MarketError> {
        let payload = self
            .request(
                "tickers",
                vec![("search", query.to_string()), ("limit", SEARCH_LIMIT.to_string())],
            )
            .await?;
        parse_data(payload)
    }

    async fn fetch_history(&self, symbol: &str, days: u32) -> Result<Vec<HistoricalPrice>, MarketError> {
        let date_to = Utc::now().date_naive();
        let date_from = date_to - Duration::days(i64::from(days));
        let payload = self
            .request(
                "eod",
                vec![
                    ("symbols", symbol.to_string()),
                    ("date_from", date_from.format("%Y-%m-%d").to_string()),
                    ("date_to", date_to.format("%Y-%m-%d").to_string()),
                    ("limit", days.to_string()),
                ],
            )
            .await?;

        let history: Vec<HistoricalPrice> = parse_data(payload)?;
        if history.is_empty() {
            return Err(MarketError::NotFound(symbol.to_string()));
        }
        Ok(history)
    }

    async fn fetch_exchanges(&self) -> Result<Vec<Exchange>, MarketError> {
        let payload = self.request("exchanges", Vec::new()).await?;
        parse_data(payload)
    }

    /// Latest end-of-day records for `symbols` in one paced request
    async fn request_latest(&self, symbols: &[String]) -> Result<Vec<Stock>, MarketError> {
        let payload = self
            .request("eod/latest", vec![("symbols", symbols.join(","))])
            .await?;
        parse_data(payload)
    }

    async fn request(&self, endpoint: &str, mut query: Vec<(&str, String)>) -> Result<Value, MarketError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        query.insert(0, ("access_key", self.config.access_key.clone()));
        self.access.request(&url, &query).await
    }
}

/// Upper-cases and trims a ticker symbol
fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Extracts the `data` array, turning an `error` body into `RemoteApi`
fn parse_data<T: DeserializeOwned>(payload: Value) -> Result<Vec<T>, MarketError> {
    let response: ApiResponse<T> = serde_json::from_value(payload)?;

    if let Some(error) = response.error {
        return Err(MarketError::RemoteApi {
            code: error.code.unwrap_or_else(|| "unknown".to_string()),
            message: error.message.unwrap_or_default(),
        });
    }

    response
        .data
        .ok_or_else(|| MarketError::Parse("response has neither data nor error".to_string()))
}
