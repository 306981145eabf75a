use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Home,
}

/// Holds the view the user should be looking at. Front ends subscribe to it;
/// the session layer only ever redirects.
#[derive(Clone)]
pub struct Navigator {
    tx: Arc<watch::Sender<Route>>,
}

impl Navigator {
    pub fn new(initial: Route) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn redirect(&self, route: Route) {
        let previous = self.tx.send_replace(route);
        if previous != route {
            tracing::debug!(?previous, ?route, "navigating");
        }
    }

    pub fn current(&self) -> Route {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.tx.subscribe()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Login)
    }
}

/// Query parameters the backend appends when the Google OAuth flow redirects
/// back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCallback {
    pub token: String,
}

impl OAuthCallback {
    /// Accepts a full callback URL or a bare query string.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let url = Url::parse(input)
            .or_else(|_| Url::parse(&format!("http://callback.local/{}", ensure_query(input))))
            .ok()?;

        let mut login_ok = false;
        let mut token = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "login" => login_ok = value == "success",
                "token" => {
                    let value = value.trim();
                    if !value.is_empty() {
                        token = Some(value.to_string());
                    }
                }
                _ => {}
            }
        }

        if !login_ok {
            return None;
        }
        token.map(|token| Self { token })
    }
}

fn ensure_query(input: &str) -> String {
    if input.starts_with('?') {
        input.to_string()
    } else {
        format!("?{input}")
    }
}
