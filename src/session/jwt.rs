use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;
use time::OffsetDateTime;

/// Reads the `exp` claim of a JWT access token without verifying it. Display
/// only; the backend stays the judge of validity.
pub fn access_token_expiry(token: &str) -> Option<OffsetDateTime> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    OffsetDateTime::from_unix_timestamp(exp).ok()
}

pub fn access_token_expiry_rfc3339(token: &str) -> Option<String> {
    access_token_expiry(token)?
        .format(&time::format_description::well_known::Rfc3339)
        .ok()
}
