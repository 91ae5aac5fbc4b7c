//! Authentication provider seam and session persistence
//!
//! Identity management itself belongs to an external provider. The application
//! only needs the current user id, sign in/out, and change notifications; the
//! last signed-in user id is mirrored into the durable store so a session can
//! be restored on the next start.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::storage::{KvStore, StorageError};

/// Store key of the persisted session
pub const AUTH_STATE_KEY: &str = "@auth_state";

/// Errors reported by an authentication provider
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email/password pair rejected
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The provider failed for another reason
    #[error("Authentication provider error: {0}")]
    Provider(String),

    /// Persisting the session failed
    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

/// External identity provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Id of the signed-in user, if any
    fn current_user_id(&self) -> Option<String>;

    /// Signs in and returns the user id
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Subscribes to sign-in/sign-out changes
    fn subscribe(&self) -> AuthSubscription;
}

/// Stream of auth state changes; dropping it unsubscribes
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: watch::Receiver<Option<String>>,
}

impl AuthSubscription {
    pub fn new(receiver: watch::Receiver<Option<String>>) -> Self {
        Self { receiver }
    }

    /// User id as of the latest change
    pub fn current(&self) -> Option<String> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next change
    ///
    /// Returns `None` once the provider has gone away.
    pub async fn changed(&mut self) -> Option<Option<String>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {}
}

/// Persisted session marker
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn store_auth_state(&self, user_id: &str) -> Result<(), StorageError> {
        self.store.set(AUTH_STATE_KEY, user_id).await
    }

    pub async fn clear_auth_state(&self) -> Result<(), StorageError> {
        self.store.remove(AUTH_STATE_KEY).await
    }

    /// Last persisted user id; storage failures read as no session
    pub async fn stored_auth_state(&self) -> Option<String> {
        match self.store.get(AUTH_STATE_KEY).await {
            Ok(user_id) => user_id,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                None
            }
        }
    }

    /// Whether a persisted session exists that the provider has not restored yet
    pub async fn needs_restore(&self, provider: &dyn AuthProvider) -> bool {
        self.stored_auth_state().await.is_some() && provider.current_user_id().is_none()
    }

    /// Signs in through `provider` and persists the session
    pub async fn sign_in(
        &self,
        provider: &dyn AuthProvider,
        email: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        let user_id = provider.sign_in(email, password).await?;
        self.store_auth_state(&user_id).await?;
        Ok(user_id)
    }

    /// Clears the persisted session, then signs out through `provider`
    pub async fn sign_out(&self, provider: &dyn AuthProvider) -> Result<(), AuthError> {
        self.clear_auth_state().await?;
        provider.sign_out().await
    }

    /// Mirrors every auth change into the persisted session until the provider goes away
    pub fn persist_changes(&self, mut subscription: AuthSubscription) -> JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            while let Some(change) = subscription.changed().await {
                let result = match &change {
                    Some(user_id) => sessions.store_auth_state(user_id).await,
                    None => sessions.clear_auth_state().await,
                };
                match result {
                    Ok(()) => debug!(user_id = ?change, "Session persisted"),
                    Err(e) => warn!(error = %e, "Failed to persist session change"),
                }
            }
        })
    }
}

/// Keeps `@auth_state` in step with `provider` for as long as it lives
pub fn persist_sessions(provider: &dyn AuthProvider, sessions: &SessionStore) -> JoinHandle<()> {
    sessions.persist_changes(provider.subscribe())
}
