use chrono::{DateTime, Duration as ChronoDuration, Utc};
use core_lib::domain::refresh_token::RefreshTokenRecord;
use core_lib::domain::user::{Role, User};
use jsonwebtoken::{Algorithm, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::ApplicationError;
use super::keys::KeyProvider;

/// Who a token speaks for. Captured at issuance and never re-read from the user store
/// while the token lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            tenant_id: user.tenant_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub role: Role,
    #[serde(rename = "tenantId", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub role: Role,
    #[serde(rename = "tenantId", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    /// Id of the persisted refresh token record.
    pub jti: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub,
            role: self.role,
            tenant_id: self.tenant_id,
        }
    }
}

impl RefreshClaims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub,
            role: self.role,
            tenant_id: self.tenant_id,
        }
    }
}

/// Mints both token types. Pure apart from reading the clock.
pub struct TokenIssuer {
    keys: Arc<KeyProvider>,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        keys: Arc<KeyProvider>,
        issuer: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Expiry to persist for a refresh record created at `now`.
    pub fn refresh_expiry(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ApplicationError> {
        let ttl = ChronoDuration::from_std(self.refresh_ttl)
            .map_err(|e| ApplicationError::Configuration(format!("refresh TTL out of range: {e}")))?;
        now.checked_add_signed(ttl).ok_or_else(|| {
            ApplicationError::Configuration("refresh token expiry out of range".into())
        })
    }

    fn access_expiry(&self, iat: i64) -> Result<i64, ApplicationError> {
        i64::try_from(self.access_ttl.as_secs())
            .ok()
            .and_then(|ttl| iat.checked_add(ttl))
            .ok_or_else(|| ApplicationError::Configuration("access token expiry out of range".into()))
    }

    /// RS256, `kid` in the header.
    pub fn issue_access_token(&self, identity: &Identity) -> Result<String, ApplicationError> {
        let iat = Utc::now().timestamp();
        let exp = self.access_expiry(iat)?;
        let claims = AccessClaims {
            sub: identity.user_id,
            role: identity.role,
            tenant_id: identity.tenant_id,
            iss: self.issuer.clone(),
            iat,
            exp,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.key_id().to_string());

        jsonwebtoken::encode(&header, &claims, self.keys.signing_key())
            .map_err(|e| ApplicationError::Internal(format!("failed to sign access token: {e}")))
    }

    /// HS256. `jti` and `exp` come from the record persisted just before.
    pub fn issue_refresh_token(
        &self,
        identity: &Identity,
        record: &RefreshTokenRecord,
    ) -> Result<String, ApplicationError> {
        let claims = RefreshClaims {
            sub: identity.user_id,
            role: identity.role,
            tenant_id: identity.tenant_id,
            jti: record.id,
            iss: self.issuer.clone(),
            iat: Utc::now().timestamp(),
            exp: record.expires_at.timestamp(),
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            self.keys.refresh_secret(),
        )
        .map_err(|e| ApplicationError::Internal(format!("failed to sign refresh token: {e}")))
    }
}
