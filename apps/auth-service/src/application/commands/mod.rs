use axum::http::{HeaderValue, header::SET_COOKIE};
use axum::response::AppendHeaders;

use super::ApplicationError;
use super::cookies::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, clear_cookie, token_cookie};
use super::session::SessionTokens;
use crate::AppState;

pub mod create_tenant;
pub mod current_user;
pub mod delete_user;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod register_user;
pub mod update_user_role;

pub use create_tenant::CreateTenantHandler;

const STATUS_SUCCESS: &str = "success";

type CookieHeaders = AppendHeaders<[(axum::http::HeaderName, HeaderValue); 2]>;

/// Both session cookies. Max-Age follows the token TTLs.
pub(crate) fn session_cookies(
    state: &AppState,
    tokens: &SessionTokens,
) -> Result<CookieHeaders, ApplicationError> {
    let settings = &state.config.cookies;
    Ok(AppendHeaders([
        (
            SET_COOKIE,
            token_cookie(
                settings,
                ACCESS_TOKEN_COOKIE,
                &tokens.access_token,
                state.config.access_token_ttl,
            )?,
        ),
        (
            SET_COOKIE,
            token_cookie(
                settings,
                REFRESH_TOKEN_COOKIE,
                &tokens.refresh_token,
                state.config.refresh_token_ttl,
            )?,
        ),
    ]))
}

pub(crate) fn cleared_cookies(state: &AppState) -> Result<CookieHeaders, ApplicationError> {
    let settings = &state.config.cookies;
    Ok(AppendHeaders([
        (SET_COOKIE, clear_cookie(settings, ACCESS_TOKEN_COOKIE)?),
        (SET_COOKIE, clear_cookie(settings, REFRESH_TOKEN_COOKIE)?),
    ]))
}
