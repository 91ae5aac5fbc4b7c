//! Bookmarked stock symbols and F1 drivers

use std::sync::Arc;
use tracing::warn;

use super::user_key;
use crate::storage::{KvStore, StorageError};

/// Setting name of the bookmarked stock list
const BOOKMARKED_STOCKS: &str = "bookmarkedStocks";

/// Setting name of the bookmarked driver list
const BOOKMARKED_DRIVERS: &str = "bookmarkedDrivers";

/// A user's bookmarks, each kind stored as a JSON array of ids
///
/// Stock symbols are upper-cased; driver ids are kept as the API spells them.
#[derive(Clone)]
pub struct Bookmarks {
    store: Arc<dyn KvStore>,
}

impl Bookmarks {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Symbols bookmarked by `user_id`, in insertion order
    ///
    /// Unreadable or missing data yields an empty list.
    pub async fn stock_symbols(&self, user_id: &str) -> Vec<String> {
        self.list(BOOKMARKED_STOCKS, user_id).await
    }

    pub async fn is_stock_bookmarked(&self, user_id: &str, symbol: &str) -> bool {
        self.stock_symbols(user_id).await.contains(&normalize_symbol(symbol))
    }

    /// Adds `symbol`; adding an existing bookmark is a no-op
    pub async fn add_stock(&self, user_id: &str, symbol: &str) -> Result<(), StorageError> {
        self.add(BOOKMARKED_STOCKS, user_id, normalize_symbol(symbol))
            .await
    }

    pub async fn remove_stock(&self, user_id: &str, symbol: &str) -> Result<(), StorageError> {
        self.remove(BOOKMARKED_STOCKS, user_id, &normalize_symbol(symbol))
            .await
    }

    /// Driver ids bookmarked by `user_id`, in insertion order
    pub async fn driver_ids(&self, user_id: &str) -> Vec<String> {
        self.list(BOOKMARKED_DRIVERS, user_id).await
    }

    pub async fn is_driver_bookmarked(&self, user_id: &str, driver_id: &str) -> bool {
        self.driver_ids(user_id)
            .await
            .iter()
            .any(|id| id == driver_id.trim())
    }

    pub async fn add_driver(&self, user_id: &str, driver_id: &str) -> Result<(), StorageError> {
        self.add(BOOKMARKED_DRIVERS, user_id, driver_id.trim().to_string())
            .await
    }

    pub async fn remove_driver(&self, user_id: &str, driver_id: &str) -> Result<(), StorageError> {
        self.remove(BOOKMARKED_DRIVERS, user_id, driver_id.trim())
            .await
    }

    async fn list(&self, setting: &str, user_id: &str) -> Vec<String> {
        let raw = match self.store.get(&user_key(setting, user_id)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(setting, user_id, error = %e, "Failed to read bookmarks");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(setting, user_id, error = %e, "Bookmark list is corrupt, treating as empty");
            Vec::new()
        })
    }

    async fn add(&self, setting: &str, user_id: &str, id: String) -> Result<(), StorageError> {
        let mut ids = self.list(setting, user_id).await;
        if ids.contains(&id) {
            return Ok(());
        }
        ids.push(id);
        self.save(setting, user_id, &ids).await
    }

    async fn remove(&self, setting: &str, user_id: &str, id: &str) -> Result<(), StorageError> {
        let mut ids = self.list(setting, user_id).await;
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() == before {
            return Ok(());
        }
        self.save(setting, user_id, &ids).await
    }

    async fn save(&self, setting: &str, user_id: &str, ids: &[String]) -> Result<(), StorageError> {
        // Serializing a list of strings cannot fail
        let raw = serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string());
        self.store.set(&user_key(setting, user_id), &raw).await
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
