//! Session transport: where credentials live on the wire.
//!
//! The refresh token travels only in a protected cookie; the access token
//! only in the `Authorization` header.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

pub const REFRESH_COOKIE: &str = "refreshToken";

/// `Set-Cookie` value carrying a refresh token until `expires_at`.
pub fn refresh_cookie(token: &str, expires_at: DateTime<Utc>) -> Option<HeaderValue> {
    let value = format!(
        "{REFRESH_COOKIE}={token}; HttpOnly; Secure; SameSite=Strict; Path=/; Expires={}",
        expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
    );
    HeaderValue::from_str(&value).ok()
}

/// `Set-Cookie` value that makes the client drop the refresh cookie.
pub fn cleared_refresh_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "refreshToken=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0",
    )
}

/// The refresh token from the request's `Cookie` headers, if present and
/// non-empty.
pub fn read_refresh_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// The access token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
