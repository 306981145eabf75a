use super::storage::{MemoryStorage, SessionStorage, StorageError, StorageKey};
use crate::types::{SessionState, UserProfile};
use std::sync::Arc;

/// The one owner of persisted session data. Request-building code goes through
/// this type and never touches the storage backend directly.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionStorage>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    fn read(&self, key: StorageKey) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(key = key.as_str(), error = %e, "failed to read session storage");
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(StorageKey::AccessToken)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(StorageKey::RefreshToken)
    }

    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.read(StorageKey::User)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "cached user profile is not valid json; ignoring it");
                None
            }
        }
    }

    /// Stores a fresh access token. A `None` refresh token keeps the stored one.
    pub fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StorageError> {
        self.backend.set(StorageKey::AccessToken, access_token)?;
        if let Some(refresh_token) = refresh_token {
            self.backend.set(StorageKey::RefreshToken, refresh_token)?;
        }
        Ok(())
    }

    pub fn store_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        let json = serde_json::to_string(user)?;
        self.backend.set(StorageKey::User, &json)
    }

    /// Removes every session key, even when an earlier removal fails; the
    /// first failure is returned.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut first_error = None;
        for key in StorageKey::ALL {
            if let Err(e) = self.backend.remove(key) {
                tracing::warn!(key = key.as_str(), error = %e, "failed to clear session key");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn is_empty(&self) -> bool {
        StorageKey::ALL.iter().all(|key| self.read(*key).is_none())
    }

    pub fn state(&self) -> SessionState {
        if self.access_token().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }
}
