//! Per-user persisted state
//!
//! Bookmarks and settings are stored under `<settingName>_<userId>` keys in the
//! same durable store as the cache, outside the cache namespace, and never
//! expire. Every operation takes the user id explicitly.

pub mod auth;
pub mod bookmarks;
pub mod settings;

pub use auth::{
    persist_sessions, AuthError, AuthProvider, AuthSubscription, SessionStore, AUTH_STATE_KEY,
};
pub use bookmarks::Bookmarks;
pub use settings::{Settings, Theme, UserSettings};

/// Store key of a per-user value
pub(crate) fn user_key(setting: &str, user_id: &str) -> String {
    format!("{}_{}", setting, user_id)
}
