//! HTTP transport for the remote APIs
//!
//! The data clients only need "GET this URL with these query parameters and give
//! me the JSON back", so that is the whole `HttpFetch` surface. `ReqwestFetcher`
//! is the production implementation; tests substitute scripted fetchers.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default timeout for a single outbound request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when talking to the remote APIs
#[derive(Debug, Error)]
pub enum MarketError {
    /// Transport failure: DNS, connect, timeout, interrupted body
    #[error("Network request failed: {0}")]
    Network(String),

    /// The API answered but reported an error (non-2xx or an `error` body)
    #[error("Remote API error ({code}): {message}")]
    RemoteApi { code: String, message: String },

    /// The API answered successfully with no matching record
    #[error("No data found for {0}")]
    NotFound(String),

    /// The response body did not have the expected shape
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// The request failed and no cached value exists to fall back on
    #[error("No cached data available for '{key}': {source}")]
    NoCacheAvailable {
        key: String,
        #[source]
        source: Box<MarketError>,
    },
}

impl From<reqwest::Error> for MarketError {
    fn from(e: reqwest::Error) -> Self {
        MarketError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(e: serde_json::Error) -> Self {
        MarketError::Parse(e.to_string())
    }
}

/// Issues GET requests that return JSON
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetches `url` with `query` appended and parses the body as JSON
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, MarketError>;
}

/// `HttpFetch` backed by a `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, MarketError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, MarketError> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(error_from_status(status.as_u16(), &text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Builds a `RemoteApi` error for a non-2xx response, preferring the API's own
/// `{"error": {"code", "message"}}` body when present
fn error_from_status(status: u16, body: &str) -> MarketError {
    let reported = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        let error = json.get("error")?;
        Some(MarketError::RemoteApi {
            code: error
                .get("code")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string()),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    });

    reported.unwrap_or_else(|| MarketError::RemoteApi {
        code: status.to_string(),
        message: format!("HTTP status {}", status),
    })
}
