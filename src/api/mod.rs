mod auth;
mod client;
mod comments;
pub mod decode;
mod error;
mod posts;
mod users;

pub use client::ApiClient;
pub use error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Percent-encodes one path segment.
pub(crate) fn seg(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

#[cfg(test)]
pub(crate) use client::tests::{client_for, sign_in};
