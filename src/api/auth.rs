use super::{decode, ApiClient, ApiError};
use crate::navigation::OAuthCallback;
use crate::session::PendingRequest;
use crate::types::{AuthTokens, SignOutReason, UserProfile};
use serde_json::json;

impl ApiClient {
    /// Exchanges credentials for a token pair and starts a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let body = self
            .execute_json(
                PendingRequest::post("/auth/login")
                    .json(json!({ "email": email, "password": password }))
                    .without_refresh(),
            )
            .await?;
        self.start_session_from(&body).await
    }

    /// Some backends answer registration with a token pair directly; the
    /// rest need a follow-up login.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ApiError> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::InvalidInput(
                "username, email and password are required".to_string(),
            ));
        }
        let body = self
            .execute_json(
                PendingRequest::post("/auth/register")
                    .json(json!({ "username": username, "email": email, "password": password }))
                    .without_refresh(),
            )
            .await?;

        if decode::auth_response(&body).is_some() {
            return self.start_session_from(&body).await;
        }
        tracing::debug!("registration returned no tokens; logging in");
        self.login(email, password).await
    }

    async fn start_session_from(&self, body: &serde_json::Value) -> Result<UserProfile, ApiError> {
        let (tokens, user) = decode::auth_response(body)
            .ok_or_else(|| ApiError::Decode("response carried no access token".to_string()))?;
        self.session().begin_session(&tokens, user.as_ref())?;
        match user {
            Some(user) => Ok(user),
            None => self.profile_or_rollback().await,
        }
    }

    /// A session whose profile cannot be loaded is not kept.
    async fn profile_or_rollback(&self) -> Result<UserProfile, ApiError> {
        match self.fetch_profile().await {
            Ok(user) => Ok(user),
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed after sign-in; discarding session");
                self.session().end_session(SignOutReason::ProfileUnavailable);
                Err(e)
            }
        }
    }

    /// Local state is always cleared, even when the backend call fails or
    /// there is no session at all.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.session().store().refresh_token() {
            let request = PendingRequest::post("/auth/logout")
                .json(json!({ "refreshToken": refresh_token }))
                .without_refresh();
            if let Err(e) = self.execute_unit(request).await {
                tracing::warn!(error = %e, "backend logout failed; clearing local session anyway");
            }
        }
        self.session().end_session(SignOutReason::UserLogout);
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let body = self.execute_json(PendingRequest::get("/auth/profile")).await?;
        let user = decode::user_profile(&body)
            .ok_or_else(|| ApiError::Decode("profile response carried no user".to_string()))?;
        self.session().update_cached_user(&user)?;
        Ok(user)
    }

    /// The OAuth redirect only carries an access token; the profile is
    /// fetched with it.
    pub async fn complete_oauth(&self, callback: &OAuthCallback) -> Result<UserProfile, ApiError> {
        let tokens = AuthTokens {
            access_token: callback.token.clone(),
            refresh_token: None,
        };
        self.session().begin_session(&tokens, None)?;
        self.profile_or_rollback().await
    }

    pub fn google_login_url(&self) -> String {
        format!("{}/auth/google", self.base_url())
    }
}
