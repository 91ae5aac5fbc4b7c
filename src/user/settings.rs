//! Display name, theme and currency preferences

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

use super::user_key;
use crate::data::Currency;
use crate::storage::{KvStore, StorageError};

const DISPLAY_NAME: &str = "displayName";
const THEME: &str = "theme";
const CURRENCY: &str = "currency";

/// Colour scheme preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(format!("Invalid theme: '{}'. Valid themes: light, dark", s)),
        }
    }
}

/// All preferences of one user
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    pub display_name: String,
    pub theme: Theme,
    pub currency: Currency,
}

/// Reads and writes per-user preferences
///
/// Reads never fail: missing or unreadable values fall back to the defaults
/// (empty name, light theme, USD).
#[derive(Clone)]
pub struct UserSettings {
    store: Arc<dyn KvStore>,
}

impl UserSettings {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn display_name(&self, user_id: &str) -> String {
        self.read(DISPLAY_NAME, user_id).await.unwrap_or_default()
    }

    pub async fn save_display_name(&self, user_id: &str, name: &str) -> Result<(), StorageError> {
        self.store.set(&user_key(DISPLAY_NAME, user_id), name).await
    }

    /// Anything other than a stored `"dark"` reads as light
    pub async fn theme(&self, user_id: &str) -> Theme {
        match self.read(THEME, user_id).await.as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub async fn save_theme(&self, user_id: &str, theme: Theme) -> Result<(), StorageError> {
        self.store
            .set(&user_key(THEME, user_id), theme.as_str())
            .await
    }

    pub async fn currency(&self, user_id: &str) -> Currency {
        self.read(CURRENCY, user_id)
            .await
            .and_then(|code| Currency::from_code(&code))
            .unwrap_or_default()
    }

    pub async fn save_currency(&self, user_id: &str, currency: Currency) -> Result<(), StorageError> {
        self.store
            .set(&user_key(CURRENCY, user_id), currency.code())
            .await
    }

    /// Loads every preference of `user_id`
    pub async fn load(&self, user_id: &str) -> Settings {
        Settings {
            display_name: self.display_name(user_id).await,
            theme: self.theme(user_id).await,
            currency: self.currency(user_id).await,
        }
    }

    /// Saves name and theme, and the currency when given
    pub async fn save_user_settings(
        &self,
        user_id: &str,
        display_name: &str,
        theme: Theme,
        currency: Option<Currency>,
    ) -> Result<(), StorageError> {
        self.save_display_name(user_id, display_name).await?;
        self.save_theme(user_id, theme).await?;
        if let Some(currency) = currency {
            self.save_currency(user_id, currency).await?;
        }
        Ok(())
    }

    async fn read(&self, setting: &str, user_id: &str) -> Option<String> {
        match self.store.get(&user_key(setting, user_id)).await {
            Ok(value) => value,
            Err(e) => {
                warn!(setting, user_id, error = %e, "Failed to read user setting");
                None
            }
        }
    }
}
