use super::decode;
use crate::redact::redact_secrets;
use crate::state::StorageError;
use crate::types::ErrorCode;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{message} ({status})")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("not signed in")]
    NotSignedIn,
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    pub(crate) async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        Self::from_status(status, &body)
    }

    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let message = decode::error_message(body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
        Self::Status {
            status: status.as_u16(),
            message: redact_secrets(&message).into_owned(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Status { status: 401, .. } => ErrorCode::Unauthorized,
            Self::Status { status: 404, .. } => ErrorCode::NotFound,
            Self::Status { .. } => ErrorCode::Rejected,
            Self::Network(_) => ErrorCode::Network,
            Self::Decode(_) => ErrorCode::Unknown,
            Self::Storage(_) => ErrorCode::Storage,
            Self::NotSignedIn => ErrorCode::NotSignedIn,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_is_preferred_over_status_line() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message":"Title is required"}"#);
        assert_eq!(err.to_string(), "Title is required (400)");
        assert_eq!(err.code(), ErrorCode::Rejected);
    }

    #[test]
    fn empty_body_falls_back_to_reason_phrase() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Unauthorized (401)");
    }

    #[test]
    fn forbidden_is_not_an_authorization_failure() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert!(!err.is_unauthorized());
    }
}
