//! Core data models and the data access layer
//!
//! This module contains the market-data types (quotes, tickers, price history,
//! exchanges), the currency types, the F1 driver roster, and the clients that
//! fetch them from the remote APIs through the cache and the shared rate limiter.

pub mod access;
pub mod currency;
pub mod drivers;
pub mod fetch;
pub mod market;

pub use access::DataAccess;
pub use currency::{Currency, CurrencyClient, ExchangeRates};
pub use drivers::{Driver, DriverClient};
pub use fetch::{HttpFetch, MarketError, ReqwestFetcher, DEFAULT_REQUEST_TIMEOUT};
pub use market::{MarketClient, POPULAR_SYMBOLS};

use serde::{Deserialize, Serialize};

/// End-of-day quote for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub symbol: String,
    /// Company name, when the endpoint provides it
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exchange: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub adj_open: Option<f64>,
    #[serde(default)]
    pub adj_high: Option<f64>,
    #[serde(default)]
    pub adj_low: Option<f64>,
    #[serde(default)]
    pub adj_close: Option<f64>,
    #[serde(default)]
    pub adj_volume: Option<f64>,
    #[serde(default = "default_split_factor")]
    pub split_factor: f64,
    #[serde(default)]
    pub dividend: f64,
    /// Trading date as reported by the API (ISO 8601)
    pub date: String,
}

fn default_split_factor() -> f64 {
    1.0
}

impl Stock {
    /// Change from the session open to the close
    pub fn daily_change(&self) -> PriceChange {
        calculate_price_change(self.close, self.open)
    }
}

/// Exchange a ticker is listed on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockExchange {
    pub name: String,
    pub acronym: String,
    pub mic: String,
    pub country: Option<String>,
    pub country_code: String,
    pub city: String,
    pub website: String,
}

/// Search result: a symbol and its listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub stock_exchange: Option<StockExchange>,
}

/// One day of price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPrice {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub adj_close: Option<f64>,
    pub symbol: String,
    #[serde(default)]
    pub exchange: String,
    pub date: String,
}

/// Timezone information of an exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeTimezone {
    pub timezone: String,
    pub abbr: String,
    pub abbr_dst: String,
}

/// A stock exchange from the exchange listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exchange {
    pub name: String,
    pub acronym: String,
    pub mic: String,
    pub country: Option<String>,
    pub country_code: String,
    pub city: String,
    pub website: String,
    pub timezone: Option<ExchangeTimezone>,
}

/// Difference between two prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceChange {
    pub change: f64,
    /// Change relative to the previous price, in percent
    pub change_percent: f64,
    pub is_positive: bool,
}

/// Computes the change from `previous` to `current`
///
/// A zero `previous` yields a 0% change rather than an infinite one.
pub fn calculate_price_change(current: f64, previous: f64) -> PriceChange {
    let change = current - previous;
    let change_percent = if previous == 0.0 {
        0.0
    } else {
        change / previous * 100.0
    };

    PriceChange {
        change,
        change_percent,
        is_positive: change >= 0.0,
    }
}
