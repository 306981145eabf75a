mod jwt;
mod manager;
mod refresh;
mod request;

pub use jwt::{access_token_expiry, access_token_expiry_rfc3339};
pub use manager::{Recovery, RequestFailure, SessionManager};
pub use refresh::RefreshError;
pub use request::{MultipartBody, PendingRequest, RequestBody, RetryPolicy};
