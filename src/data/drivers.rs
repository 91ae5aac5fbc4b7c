//! Formula 1 driver roster client
//!
//! Reads the season driver list from an Ergast-compatible API. The response
//! nests the list as `MRData.DriverTable.Drivers`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::access::DataAccess;
use super::fetch::MarketError;

/// Base URL of the Ergast-compatible F1 API
pub const DEFAULT_DRIVERS_BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";

/// Season shown when none is requested
pub const DEFAULT_SEASON: u16 = 2025;

/// Page size requested so a full grid fits in one response
const DRIVER_PAGE_LIMIT: u32 = 100;

/// A driver entered in a season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub driver_id: String,
    #[serde(default)]
    pub permanent_number: Option<String>,
    /// Three-letter abbreviation, e.g. `VER`
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub given_name: String,
    pub family_name: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub nationality: String,
}

impl Driver {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DriverTable {
    drivers: Vec<Driver>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DriverData {
    driver_table: DriverTable,
}

#[derive(Debug, Deserialize)]
struct DriversResponse {
    #[serde(rename = "MRData")]
    mr_data: DriverData,
}

/// Client for the F1 driver roster
#[derive(Debug, Clone)]
pub struct DriverClient {
    access: DataAccess,
    base_url: String,
}

impl DriverClient {
    pub fn new(access: DataAccess, base_url: impl Into<String>) -> Self {
        Self {
            access,
            base_url: base_url.into(),
        }
    }

    /// Cache key of a season roster
    pub fn drivers_key(season: u16) -> String {
        format!("drivers_{}", season)
    }

    /// Fetches every driver entered in `season`
    ///
    /// Cached like the market data and served stale when the API is down.
    pub async fn get_drivers(&self, season: u16, force_refresh: bool) -> Result<Vec<Driver>, MarketError> {
        self.access
            .fetch_cached(&Self::drivers_key(season), force_refresh, || {
                self.fetch_drivers(season)
            })
            .await
    }

    async fn fetch_drivers(&self, season: u16) -> Result<Vec<Driver>, MarketError> {
        let url = format!("{}/{}/drivers/", self.base_url.trim_end_matches('/'), season);
        let payload = self
            .access
            .request(&url, &[("limit", DRIVER_PAGE_LIMIT.to_string())])
            .await?;
        parse_drivers(payload)
    }
}

fn parse_drivers(payload: Value) -> Result<Vec<Driver>, MarketError> {
    let response: DriversResponse = serde_json::from_value(payload)?;
    Ok(response.mr_data.driver_table.drivers)
}
