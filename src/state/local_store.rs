use super::storage::{SessionStorage, StorageError, StorageKey};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCAL_STORE_FILE: &str = "photoshare-session.json";

/// JSON-file backed key/value store, the on-disk counterpart of a browser's
/// local storage. Each write re-reads the file and changes only its own key,
/// so concurrent processes sharing the file do not undo each other's writes.
pub struct FileStorage {
  path: PathBuf,
  write_lock: Mutex<()>,
}

impl FileStorage {
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
    let storage = Self {
      path: path.into(),
      write_lock: Mutex::new(()),
    };
    storage.load()?;
    Ok(storage)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn load(&self) -> Result<Map<String, Value>, StorageError> {
    match fs::read_to_string(&self.path) {
      Ok(text) if text.trim().is_empty() => Ok(Map::new()),
      Ok(text) => match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => {
          tracing::warn!(path = %self.path.display(), "session file is corrupt; treating it as empty");
          Ok(Map::new())
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
      Err(e) => Err(e.into()),
    }
  }

  fn persist(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(entries)?;
    let tmp = self
      .path
      .with_extension(format!("json.{}.tmp", std::process::id()));
    fs::write(&tmp, text)?;
    fs::rename(&tmp, &self.path)?;
    Ok(())
  }

  /// Applies one change on top of the current file contents.
  fn update<F>(&self, change: F) -> Result<(), StorageError>
  where
    F: FnOnce(&mut Map<String, Value>) -> bool,
  {
    let _guard = self.write_lock.lock();
    let mut entries = self.load()?;
    if change(&mut entries) {
      self.persist(&entries)?;
    }
    Ok(())
  }
}

impl SessionStorage for FileStorage {
  fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
    let entries = self.load()?;
    let value = entries
      .get(key.as_str())
      .and_then(|v| v.as_str())
      .map(|s| s.trim())
      .filter(|s| !s.is_empty())
      .map(|s| s.to_string());
    Ok(value)
  }

  fn set(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
    self.update(|entries| {
      entries.insert(key.as_str().to_string(), Value::String(value.to_string()));
      true
    })
  }

  fn remove(&self, key: StorageKey) -> Result<(), StorageError> {
    self.update(|entries| entries.remove(key.as_str()).is_some())
  }

  fn backend_name(&self) -> &'static str {
    "file"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join(LOCAL_STORE_FILE);

    let storage = FileStorage::open(&path).unwrap();
    storage.set(StorageKey::AccessToken, "A1").unwrap();
    storage.set(StorageKey::RefreshToken, "R1").unwrap();
    storage.remove(StorageKey::RefreshToken).unwrap();

    let reopened = FileStorage::open(&path).unwrap();
    assert_eq!(reopened.get(StorageKey::AccessToken).unwrap().as_deref(), Some("A1"));
    assert_eq!(reopened.get(StorageKey::RefreshToken).unwrap(), None);

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["accessToken"], "A1");
  }

  #[test]
  fn writes_from_another_handle_are_not_undone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(LOCAL_STORE_FILE);

    let seed = FileStorage::open(&path).unwrap();
    seed.set(StorageKey::AccessToken, "A1").unwrap();
    seed.set(StorageKey::RefreshToken, "R1").unwrap();

    let first = FileStorage::open(&path).unwrap();
    let second = FileStorage::open(&path).unwrap();
    first.set(StorageKey::AccessToken, "A2").unwrap();
    first.set(StorageKey::RefreshToken, "R2").unwrap();
    second.set(StorageKey::User, r#"{"id":"u1"}"#).unwrap();

    let reopened = FileStorage::open(&path).unwrap();
    assert_eq!(reopened.get(StorageKey::AccessToken).unwrap().as_deref(), Some("A2"));
    assert_eq!(reopened.get(StorageKey::RefreshToken).unwrap().as_deref(), Some("R2"));
    assert!(reopened.get(StorageKey::User).unwrap().is_some());
    assert_eq!(second.get(StorageKey::RefreshToken).unwrap().as_deref(), Some("R2"));
  }

  #[test]
  fn corrupt_file_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(LOCAL_STORE_FILE);
    fs::write(&path, "{not json").unwrap();

    let storage = FileStorage::open(&path).unwrap();
    assert_eq!(storage.get(StorageKey::User).unwrap(), None);
  }

  #[test]
  fn removing_missing_key_does_not_create_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(LOCAL_STORE_FILE);

    let storage = FileStorage::open(&path).unwrap();
    storage.remove(StorageKey::User).unwrap();
    assert!(!path.exists());
  }
}
