//! Currency conversion
//!
//! Prices arrive in USD. Exchange rates come from a remote FX API, are cached
//! like any other response, and fall back to a small built-in table when neither
//! the API nor the cache can provide them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use super::access::DataAccess;
use super::fetch::MarketError;

/// USD-based exchange rate endpoint
pub const DEFAULT_RATES_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";

/// Cache key of the rate table
pub const RATES_CACHE_KEY: &str = "exchangeRates";

/// Mapping from currency code to units per USD
pub type ExchangeRates = HashMap<String, f64>;

/// Currencies the application can display prices in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Ron,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Ron];

    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Ron => "RON",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Currency::Usd => "US Dollar",
            Currency::Eur => "Euro",
            Currency::Ron => "Romanian Leu",
        }
    }

    /// Symbol shown before an amount
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Ron => "RON",
        }
    }

    /// Symbol used locally in the currency's own country
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Ron => "lei",
        }
    }

    /// Looks up a currency by code, case-insensitively
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|currency| currency.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("Unsupported currency: '{}'. Valid: USD, EUR, RON", s))
    }
}

/// Rates used when the API and the cache both come up empty
pub fn fallback_rates() -> ExchangeRates {
    HashMap::from([
        ("USD".to_string(), 1.0),
        ("EUR".to_string(), 0.85),
        ("RON".to_string(), 4.5),
    ])
}

/// Display symbol for a currency code; unknown codes are shown as-is
pub fn currency_symbol(code: &str) -> String {
    Currency::from_code(code)
        .map(|currency| currency.symbol().to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Formats a percentage with an explicit sign, e.g. `+1.25%`
pub fn format_percentage_change(change: f64) -> String {
    let sign = if change >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, change)
}

/// Client for the exchange-rate API
#[derive(Debug, Clone)]
pub struct CurrencyClient {
    access: DataAccess,
    rates_url: String,
}

impl CurrencyClient {
    pub fn new(access: DataAccess, rates_url: impl Into<String>) -> Self {
        Self {
            access,
            rates_url: rates_url.into(),
        }
    }

    /// Returns the USD-based rate table
    ///
    /// Never fails: cache, then API, then stale cache, then [`fallback_rates`].
    pub async fn get_exchange_rates(&self, force_refresh: bool) -> ExchangeRates {
        match self
            .access
            .fetch_cached(RATES_CACHE_KEY, force_refresh, || self.fetch_rates())
            .await
        {
            Ok(rates) => rates,
            Err(e) => {
                warn!(error = %e, "Exchange rates unavailable, using built-in table");
                fallback_rates()
            }
        }
    }

    /// Converts a USD amount into `target`
    ///
    /// Returns the USD amount unchanged when no rate is known for `target`.
    pub async fn convert_price(&self, price_usd: f64, target: Currency) -> f64 {
        if target == Currency::Usd {
            return price_usd;
        }

        let rates = self.get_exchange_rates(false).await;
        match rates.get(target.code()) {
            Some(rate) => price_usd * rate,
            None => {
                warn!(currency = %target, "Exchange rate not found, using USD");
                price_usd
            }
        }
    }

    /// Converts and formats a USD amount, e.g. `€127.50`
    pub async fn format_price(&self, price_usd: f64, currency: Currency) -> String {
        let converted = self.convert_price(price_usd, currency).await;
        format!("{}{:.2}", currency.symbol(), converted)
    }

    async fn fetch_rates(&self) -> Result<ExchangeRates, MarketError> {
        let payload = self.access.request(&self.rates_url, &[]).await?;
        parse_rates(payload)
    }
}

fn parse_rates(payload: Value) -> Result<ExchangeRates, MarketError> {
    let rates = payload
        .get("rates")
        .cloned()
        .ok_or_else(|| MarketError::Parse("Invalid exchange rate data".to_string()))?;
    Ok(serde_json::from_value(rates)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_codes_round_trip() {
        for currency in Currency::ALL {
            assert_eq!(Currency::from_code(currency.code()), Some(currency));
        }
        assert_eq!(Currency::from_code(" eur "), Some(Currency::Eur));
        assert!(Currency::from_code("GBP").is_none());
        assert!("gbp".parse::<Currency>().is_err());
    }

    #[test]
    fn test_currency_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Currency::Ron).unwrap(), "\"RON\"");
        assert_eq!(Currency::default(), Currency::Usd);
    }

    #[test]
    fn test_currency_symbol() {
        assert_eq!(currency_symbol("EUR"), "€");
        assert_eq!(currency_symbol("RON"), "RON");
        assert_eq!(currency_symbol("JPY"), "JPY");
        assert_eq!(Currency::Ron.native_symbol(), "lei");
    }

    #[test]
    fn test_format_percentage_change() {
        assert_eq!(format_percentage_change(1.234), "+1.23%");
        assert_eq!(format_percentage_change(0.0), "+0.00%");
        assert_eq!(format_percentage_change(-2.5), "-2.50%");
    }

    #[test]
    fn test_parse_rates() {
        let rates = parse_rates(serde_json::json!({"base": "USD", "rates": {"USD": 1, "EUR": 0.92}})).unwrap();
        assert_eq!(rates.get("EUR"), Some(&0.92));
        assert_eq!(rates.get("USD"), Some(&1.0));
        assert!(matches!(
            parse_rates(serde_json::json!({"result": "error"})),
            Err(MarketError::Parse(_))
        ));
    }

    #[test]
    fn test_fallback_rates() {
        let rates = fallback_rates();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates["EUR"], 0.85);
        assert_eq!(rates["RON"], 4.5);
    }
}
