use axum::http::{HeaderMap, HeaderValue, header};
use std::time::Duration;

use super::ApplicationError;
use crate::config::CookieSettings;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// `Set-Cookie` for a token: HttpOnly, SameSite=Strict, Path=/.
pub fn token_cookie(
    settings: &CookieSettings,
    name: &str,
    token: &str,
    max_age: Duration,
) -> Result<HeaderValue, ApplicationError> {
    build(settings, name, token, max_age.as_secs())
}

/// Expires the cookie immediately.
pub fn clear_cookie(settings: &CookieSettings, name: &str) -> Result<HeaderValue, ApplicationError> {
    build(settings, name, "", 0)
}

fn build(
    settings: &CookieSettings,
    name: &str,
    value: &str,
    max_age_secs: u64,
) -> Result<HeaderValue, ApplicationError> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}");
    if let Some(domain) = &settings.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if settings.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| ApplicationError::Internal(format!("invalid cookie header: {e}")))
}

/// Value of the named cookie across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, val)| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
