use crate::api::decode;
use crate::state::{SessionStore, StorageError};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    MissingRefreshToken,
    #[error("session ended while waiting for a refresh")]
    SessionEnded,
    #[error("refresh rejected ({status})")]
    Rejected { status: u16 },
    #[error("refresh request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("refresh response carried no access token")]
    Decode,
    #[error("failed to store refreshed tokens: {0}")]
    Storage(#[from] StorageError),
}

/// Exchanges the refresh token for a new access token, one exchange at a time.
pub(crate) struct TokenRefresher {
    http: reqwest::Client,
    endpoint: String,
    gate: Mutex<()>,
}

impl TokenRefresher {
    pub(crate) fn new(http: reqwest::Client, endpoint: String) -> Self {
        Self {
            http,
            endpoint,
            gate: Mutex::new(()),
        }
    }

    /// `stale` is the access token the failed request carried. Callers queued
    /// behind another refresh pick up its result instead of exchanging again.
    pub(crate) async fn refresh(
        &self,
        store: &SessionStore,
        stale: Option<&str>,
    ) -> Result<String, RefreshError> {
        let _guard = self.gate.lock().await;

        match (store.access_token(), stale) {
            (Some(current), Some(stale)) if current != stale => {
                tracing::debug!("access token already refreshed by a concurrent request");
                return Ok(current);
            }
            (Some(current), None) => {
                tracing::debug!("a session started while the request was in flight");
                return Ok(current);
            }
            (None, Some(_)) => return Err(RefreshError::SessionEnded),
            _ => {}
        }

        let refresh_token = store
            .refresh_token()
            .ok_or(RefreshError::MissingRefreshToken)?;

        tracing::debug!("exchanging refresh token");
        let res = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(RefreshError::Rejected {
                status: res.status().as_u16(),
            });
        }

        let body: Value = res.json().await?;
        let tokens = decode::refreshed_tokens(&body).ok_or(RefreshError::Decode)?;
        store.store_tokens(&tokens.access_token, tokens.refresh_token.as_deref())?;
        Ok(tokens.access_token)
    }
}
