use axum::http::HeaderMap;
use core_lib::RefreshTokenStore;
use jsonwebtoken::{Algorithm, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::ApplicationError;
use super::cookies::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, bearer_token, read_cookie};
use super::keys::KeyProvider;
use super::tokens::{AccessClaims, Identity, RefreshClaims};

/// A refresh token that passed verification, with the record id it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshIdentity {
    pub identity: Identity,
    pub token_id: Uuid,
}

/// Signature and expiry checks for both token types, plus the store-backed revocation
/// check for refresh tokens. Every rejection is the same `Unauthenticated`.
pub struct TokenVerifier {
    keys: Arc<KeyProvider>,
    store: Arc<dyn RefreshTokenStore>,
    access_validation: Validation,
    refresh_validation: Validation,
    store_timeout: Duration,
}

impl TokenVerifier {
    pub fn new(
        keys: Arc<KeyProvider>,
        store: Arc<dyn RefreshTokenStore>,
        issuer: &str,
        leeway_secs: u64,
        store_timeout: Duration,
    ) -> Self {
        Self {
            keys,
            store,
            access_validation: validation(Algorithm::RS256, issuer, leeway_secs),
            refresh_validation: validation(Algorithm::HS256, issuer, leeway_secs),
            store_timeout,
        }
    }

    /// Bearer header first, then the `accessToken` cookie. Stateless.
    pub fn verify_access(&self, headers: &HeaderMap) -> Result<Identity, ApplicationError> {
        let token = bearer_token(headers)
            .or_else(|| read_cookie(headers, ACCESS_TOKEN_COOKIE))
            .ok_or_else(|| ApplicationError::Unauthenticated("no access token".into()))?;
        Ok(self.decode_access(&token)?.identity())
    }

    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, ApplicationError> {
        jsonwebtoken::decode::<AccessClaims>(
            token,
            self.keys.verifying_key(),
            &self.access_validation,
        )
        .map(|data| data.claims)
        .map_err(|e| ApplicationError::Unauthenticated(format!("access token rejected: {e}")))
    }

    /// Signature and expiry only, no store lookup. Logout uses this so it stays
    /// idempotent for already revoked tokens.
    pub fn parse_refresh(&self, headers: &HeaderMap) -> Result<RefreshIdentity, ApplicationError> {
        let token = read_cookie(headers, REFRESH_TOKEN_COOKIE)
            .ok_or_else(|| ApplicationError::Unauthenticated("no refresh token".into()))?;
        let claims = self.decode_refresh(&token)?;
        Ok(RefreshIdentity {
            identity: claims.identity(),
            token_id: claims.jti,
        })
    }

    /// Full refresh check: signature, expiry, then the record must be live in the store.
    /// A store error or timeout fails closed.
    pub async fn verify_refresh(
        &self,
        headers: &HeaderMap,
    ) -> Result<RefreshIdentity, ApplicationError> {
        let parsed = self.parse_refresh(headers)?;
        let user_id = parsed.identity.user_id;

        let lookup = tokio::time::timeout(
            self.store_timeout,
            self.store.find_live(parsed.token_id, user_id),
        )
        .await;

        match lookup {
            Ok(Ok(Some(_))) => Ok(parsed),
            Ok(Ok(None)) => {
                warn!(user_id = %user_id, token_id = %parsed.token_id, "Refresh token is revoked or unknown");
                Err(ApplicationError::Unauthenticated(
                    "refresh token revoked".into(),
                ))
            }
            Ok(Err(e)) => {
                warn!(user_id = %user_id, error = %e, "Refresh token store failed during verification");
                Err(ApplicationError::Unauthenticated(
                    "cannot verify refresh token".into(),
                ))
            }
            Err(_) => {
                warn!(user_id = %user_id, timeout_ms = self.store_timeout.as_millis() as u64, "Refresh token store timed out during verification");
                Err(ApplicationError::Unauthenticated(
                    "cannot verify refresh token".into(),
                ))
            }
        }
    }

    fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, ApplicationError> {
        jsonwebtoken::decode::<RefreshClaims>(
            token,
            self.keys.refresh_verifying_key(),
            &self.refresh_validation,
        )
        .map(|data| data.claims)
        .map_err(|e| ApplicationError::Unauthenticated(format!("refresh token rejected: {e}")))
    }
}

fn validation(algorithm: Algorithm, issuer: &str, leeway_secs: u64) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.leeway = leeway_secs;
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation
}
