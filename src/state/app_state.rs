use super::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage, SessionStore, StorageError};
use crate::api::ApiClient;
use crate::config::{Config, ConfigError, StorageBackend};
use crate::feed::{CommentThread, LikeTracker};
use crate::navigation::Navigator;
use crate::session::SessionManager;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open session storage: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Everything a front end needs, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
    pub likes: LikeTracker,
}

fn open_storage(config: &Config) -> Result<Arc<dyn SessionStorage>, StartupError> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::File => Ok(Arc::new(FileStorage::open(config.storage_path()?)?)),
        StorageBackend::Keyring => {
            let keyring = KeyringStorage::new();
            if keyring.is_available() {
                return Ok(Arc::new(keyring));
            }
            tracing::warn!("keyring unavailable; falling back to the session file");
            Ok(Arc::new(FileStorage::open(config.storage_path()?)?))
        }
    }
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, StartupError> {
        let backend = open_storage(&config)?;
        Self::with_storage(config, backend)
    }

    pub fn with_storage(
        config: Config,
        backend: Arc<dyn SessionStorage>,
    ) -> Result<Self, StartupError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.api.user_agent.clone())
            .build()?;

        let session = Arc::new(SessionManager::new(
            SessionStore::new(backend),
            Navigator::default(),
            http.clone(),
            config.refresh_url(),
        ));
        let api = ApiClient::new(http, config.api.base_url.clone(), session.clone());
        let likes = LikeTracker::new(api.clone());

        tracing::debug!(
            base_url = %config.api.base_url,
            storage = session.store().backend_name(),
            "client state ready"
        );

        Ok(Self {
            config: Arc::new(config),
            session,
            api,
            likes,
        })
    }

    pub fn comment_thread(&self, post_id: &str) -> CommentThread {
        CommentThread::new(self.api.clone(), post_id)
    }
}
