use super::ApiError;
use crate::session::{PendingRequest, Recovery, RequestFailure, SessionManager};
use crate::types::UserProfile;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::sync::Arc;

/// Request pipeline shared by every endpoint wrapper:
/// build, attach token, send, then hand failures to the session manager, which
/// may ask for exactly one resubmission.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

fn carried_token(request: &reqwest::Request) -> Option<String> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|t| t.to_string())
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, session: Arc<SessionManager>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub(crate) fn signed_in_user(&self) -> Result<UserProfile, ApiError> {
        self.session
            .current_user()
            .filter(|u| !u.id.is_empty())
            .ok_or(ApiError::NotSignedIn)
    }

    pub(crate) fn viewer_id(&self) -> Option<String> {
        self.session
            .current_user()
            .map(|u| u.id)
            .filter(|id| !id.is_empty())
    }

    pub async fn execute(&self, request: PendingRequest) -> Result<reqwest::Response, ApiError> {
        let mut pending = request;
        loop {
            let built = self
                .session
                .attach_token(pending.build(&self.http, &self.base_url)?);
            let carried_token = carried_token(&built);
            tracing::debug!(
                method = %pending.method(),
                path = pending.path(),
                attempt = pending.attempt(),
                "sending request"
            );

            let error = match self.http.execute(built).await {
                Ok(res) if res.status().is_success() => {
                    return Ok(self.session.handle_response(res));
                }
                Ok(res) => ApiError::from_response(res).await,
                Err(e) => ApiError::Network(e),
            };

            let failure = RequestFailure {
                request: pending,
                carried_token,
                error,
            };
            match self.session.handle_error(failure).await {
                Recovery::Retry(next) => pending = next,
                Recovery::Fail(error) => return Err(error),
            }
        }
    }

    /// Empty bodies decode as `Value::Null`.
    pub async fn execute_json(&self, request: PendingRequest) -> Result<Value, ApiError> {
        let res = self.execute(request).await?;
        let text = res.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn execute_unit(&self, request: PendingRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::navigation::{Navigator, Route};
    use crate::state::SessionStore;
    use crate::types::SessionState;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn client_for(server: &MockServer) -> ApiClient {
        let http = reqwest::Client::new();
        let session = SessionManager::new(
            SessionStore::in_memory(),
            Navigator::new(Route::Home),
            http.clone(),
            format!("{}/auth/refresh", server.uri()),
        );
        ApiClient::new(http, server.uri(), Arc::new(session))
    }

    pub(crate) fn sign_in(client: &ApiClient, access: &str, refresh: &str) {
        let store = client.session().store();
        store.store_tokens(access, Some(refresh)).unwrap();
        store
            .store_user(&UserProfile {
                id: "u1".to_string(),
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                ..UserProfile::default()
            })
            .unwrap();
    }

    #[tokio::test]
    async fn signed_in_requests_carry_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R1");
        let value = client.execute_json(PendingRequest::get("/posts")).await.unwrap();
        assert_eq!(value, json!([]));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_request_resubmitted_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(header("authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "_id": "p1" }])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "A2", "refreshToken": "R2" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R1");

        let value = client.execute_json(PendingRequest::get("/posts")).await.unwrap();
        assert_eq!(value, json!([{ "_id": "p1" }]));
        assert_eq!(client.session().store().access_token().as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn second_unauthorized_response_is_returned_to_caller() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "A2" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R1");

        let err = client.execute(PendingRequest::get("/posts")).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(client.session().state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn invalid_refresh_token_empties_storage_and_later_requests_are_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R-invalid");

        let err = client.execute(PendingRequest::get("/posts")).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(client.session().store().is_empty());
        assert_eq!(client.session().navigator().current(), Route::Login);

        // The header-matching mock above only allows one hit, so this request
        // must go out without a bearer credential.
        let value = client.execute_json(PendingRequest::get("/posts")).await.unwrap();
        assert_eq!(value, json!([]));
    }

    #[tokio::test]
    async fn concurrent_unauthorized_requests_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "accessToken": "A2" }))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R1");

        let (a, b, c) = tokio::join!(
            client.execute_json(PendingRequest::get("/posts")),
            client.execute_json(PendingRequest::get("/posts/p1")),
            client.execute_json(PendingRequest::get("/posts/p1/comments")),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
    }

    #[tokio::test]
    async fn credential_exchange_failures_do_not_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Wrong email or password" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .execute(PendingRequest::post("/auth/login").without_refresh())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Wrong email or password (401)");
    }

    #[tokio::test]
    async fn empty_success_body_decodes_as_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/posts/p1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let value = client.execute_json(PendingRequest::delete("/posts/p1")).await.unwrap();
        assert_eq!(value, Value::Null);
    }
}
