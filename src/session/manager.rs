use super::refresh::TokenRefresher;
use super::request::PendingRequest;
use crate::api::ApiError;
use crate::navigation::{Navigator, Route};
use crate::state::{SessionStore, StorageError};
use crate::types::{AuthTokens, SessionState, SignOutReason, UserProfile};
use reqwest::header::{HeaderValue, AUTHORIZATION};

/// A dispatched request that came back as an error.
#[derive(Debug)]
pub struct RequestFailure {
    pub request: PendingRequest,
    /// Access token the failed attempt carried, if any.
    pub carried_token: Option<String>,
    pub error: ApiError,
}

#[derive(Debug)]
pub enum Recovery {
    Retry(PendingRequest),
    Fail(ApiError),
}

/// Mediates the authorization of every request and owns the session lifecycle:
/// `Anonymous -> Authenticated` on sign-in, refreshes while authenticated, and
/// back to `Anonymous` on logout or a failed refresh.
pub struct SessionManager {
    store: SessionStore,
    navigator: Navigator,
    refresher: TokenRefresher,
}

impl SessionManager {
    pub fn new(
        store: SessionStore,
        navigator: Navigator,
        http: reqwest::Client,
        refresh_url: String,
    ) -> Self {
        Self {
            store,
            navigator,
            refresher: TokenRefresher::new(http, refresh_url),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn state(&self) -> SessionState {
        self.store.state()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.store.user()
    }

    pub fn attach_token(&self, mut request: reqwest::Request) -> reqwest::Request {
        let Some(token) = self.store.access_token() else {
            return request;
        };
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!("stored access token is not a valid header value; sending unauthenticated");
            }
        }
        request
    }

    pub fn handle_response(&self, response: reqwest::Response) -> reqwest::Response {
        tracing::trace!(status = response.status().as_u16(), url = %response.url(), "request succeeded");
        response
    }

    pub async fn handle_error(&self, failure: RequestFailure) -> Recovery {
        let RequestFailure {
            request,
            carried_token,
            error,
        } = failure;

        if !error.is_unauthorized() || request.is_retry() || !request.can_refresh() {
            return Recovery::Fail(error);
        }

        match self
            .refresher
            .refresh(&self.store, carried_token.as_deref())
            .await
        {
            Ok(_) => {
                tracing::info!(path = request.path(), "access token refreshed; retrying request");
                Recovery::Retry(request.retry())
            }
            Err(refresh_error) => {
                tracing::warn!(error = %refresh_error, "token refresh failed; ending session");
                self.end_session(SignOutReason::RefreshFailed);
                Recovery::Fail(error)
            }
        }
    }

    /// Replaces whatever session was stored with a new one.
    pub fn begin_session(
        &self,
        tokens: &AuthTokens,
        user: Option<&UserProfile>,
    ) -> Result<(), StorageError> {
        self.store.clear()?;
        self.store
            .store_tokens(&tokens.access_token, tokens.refresh_token.as_deref())?;
        if let Some(user) = user {
            self.store.store_user(user)?;
        }
        tracing::info!(user = user.map(|u| u.username.as_str()), "session started");
        self.navigator.redirect(Route::Home);
        Ok(())
    }

    pub fn update_cached_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        self.store.store_user(user)
    }

    /// Safe to call without a session.
    pub fn end_session(&self, reason: SignOutReason) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear session storage");
        }
        tracing::info!(?reason, "session ended");
        self.navigator.redirect(Route::Login);
    }

    /// Re-enters the stored session on startup.
    pub fn restore(&self) -> SessionState {
        let state = self.store.state();
        match state {
            SessionState::Authenticated => {
                if let Some(user) = self.store.user() {
                    tracing::debug!(user = %user.username, "restored session");
                }
                self.navigator.redirect(Route::Home);
            }
            SessionState::Anonymous => self.navigator.redirect(Route::Login),
        }
        state
    }
}
