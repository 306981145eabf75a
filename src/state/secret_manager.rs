use super::storage::{SessionStorage, StorageError, StorageKey};
use parking_lot::Mutex;
use std::collections::HashMap;

const KEYRING_SERVICE: &str = "com.photoshare.client";

/// Session storage in the OS keychain / secret service, one entry per key.
/// Reads are cached in memory so the keychain is not hit on every request.
pub struct KeyringStorage {
    service: &'static str,
    in_memory: Mutex<HashMap<StorageKey, String>>,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE,
            in_memory: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: StorageKey) -> Result<keyring::Entry, keyring::Error> {
        keyring::Entry::new(self.service, key.as_str())
    }

    pub fn is_available(&self) -> bool {
        let Ok(entry) = self.entry(StorageKey::AccessToken) else {
            return false;
        };

        keychain_reachable(&entry.get_password())
    }
}

/// Only a keychain we cannot reach counts as missing.
fn keychain_reachable(lookup: &Result<String, keyring::Error>) -> bool {
    !matches!(
        lookup,
        Err(keyring::Error::NoStorageAccess(_) | keyring::Error::PlatformFailure(_))
    )
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for KeyringStorage {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        if let Some(value) = self.in_memory.lock().get(&key).cloned() {
            return Ok(Some(value));
        }

        match self.entry(key)?.get_password() {
            Ok(pwd) => {
                let trimmed = pwd.trim().to_string();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                self.in_memory.lock().insert(key, trimmed.clone());
                Ok(Some(trimmed))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::BadEncoding(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        self.in_memory.lock().insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), StorageError> {
        self.in_memory.lock().remove(&key);
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "keyring"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(std::io::Error::other("locked"))
    }

    #[test]
    fn missing_entries_still_mean_the_keychain_works() {
        assert!(keychain_reachable(&Ok("A1".to_string())));
        assert!(keychain_reachable(&Err(keyring::Error::NoEntry)));
        assert!(!keychain_reachable(&Err(keyring::Error::NoStorageAccess(io_error()))));
        assert!(!keychain_reachable(&Err(keyring::Error::PlatformFailure(io_error()))));
    }
}
