//! Client configuration: a TOML file in the platform config directory plus
//! `PHOTOSHARE_*` environment overrides. Every field has a default, so a
//! missing file is not an error.

use crate::api::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid api.base_url {0:?}")]
    InvalidBaseUrl(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: &'static str, value: String },
    #[error("no storage path configured and no platform data directory available")]
    NoStoragePath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Keyring,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "file" => Some(Self::File),
            "keyring" => Some(Self::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Session file for the `file` backend. Defaults to the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive; `PHOTOSHARE_LOG` / `RUST_LOG` take precedence.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("photoshare/{}", env!("CARGO_PKG_VERSION"))
}

fn default_backend() -> StorageBackend {
    StorageBackend::File
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "photoshare", "photoshare")
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Reads `path` (or the default location), then applies environment
    /// overrides. An explicit path must exist; the default one may not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `lookup` is `std::env::var` outside of tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("PHOTOSHARE_API_URL") {
            self.api.base_url = url.trim().to_string();
        }
        if let Some(value) = lookup("PHOTOSHARE_STORAGE") {
            self.storage.backend =
                StorageBackend::parse(&value).ok_or(ConfigError::InvalidOverride {
                    key: "PHOTOSHARE_STORAGE",
                    value,
                })?;
        }
        if let Some(path) = lookup("PHOTOSHARE_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("PHOTOSHARE_TIMEOUT_SECS") {
            self.api.timeout_secs = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    key: "PHOTOSHARE_TIMEOUT_SECS",
                    value,
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.api.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.api.base_url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl(self.api.base_url.clone()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs.max(1))
    }

    pub fn refresh_url(&self) -> String {
        format!(
            "{}{}",
            self.api.base_url.trim_end_matches('/'),
            crate::api::REFRESH_PATH
        )
    }

    pub fn storage_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join(crate::state::LOCAL_STORE_FILE))
            .ok_or(ConfigError::NoStoragePath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.refresh_url(), "http://localhost:3000/auth/refresh");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://photos.example.com/"

            [storage]
            backend = "keyring"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.storage.backend, StorageBackend::Keyring);
        assert_eq!(config.refresh_url(), "https://photos.example.com/auth/refresh");
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("PHOTOSHARE_API_URL", "http://api.test:8080"),
                ("PHOTOSHARE_STORAGE", "Memory"),
                ("PHOTOSHARE_STORAGE_PATH", "/tmp/session.json"),
                ("PHOTOSHARE_TIMEOUT_SECS", "5"),
            ]))
            .unwrap();
        assert_eq!(config.api.base_url, "http://api.test:8080");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage_path().unwrap(), PathBuf::from("/tmp/session.json"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn bad_overrides_are_reported() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("PHOTOSHARE_STORAGE", "cloud")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { key: "PHOTOSHARE_STORAGE", .. }));

        let err = config
            .apply_overrides(env(&[("PHOTOSHARE_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { key: "PHOTOSHARE_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[log]\nfilter = \"photoshare_lib=debug\"\n").unwrap();
        let config = Config::read(&path).unwrap();
        assert_eq!(config.log.filter.as_deref(), Some("photoshare_lib=debug"));
    }
}
