use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::application::ApplicationError;

const DEFAULT_SERVICE_NAME: &str = "auth-service";
const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 60 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 60 * 60 * 24 * 365;
const DEFAULT_PRIVATE_KEY_PATH: &str = "certs/private.pem";
const DEFAULT_TOKEN_LEEWAY_SECS: u64 = 30;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_JWKS_MAX_AGE_SECS: u64 = 600;
const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 5501;
const MIN_REFRESH_SECRET_LEN: usize = 32;
/// Upper bound for either token TTL (10 years).
pub const MAX_TOKEN_TTL_SECS: u64 = 60 * 60 * 24 * 365 * 10;

/// Attributes shared by both session cookies.
#[derive(Debug, Clone, Default)]
pub struct CookieSettings {
    pub domain: Option<String>,
    pub secure: bool,
}

/// Seed for the default admin account created at start.
#[derive(Clone)]
pub struct AdminSeed {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Immutable service configuration, built once at start and shared through `Arc`.
#[derive(Clone)]
pub struct AuthConfig {
    /// Token issuer (`iss`).
    pub service_name: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub private_key_pem: String,
    /// JWK `kid`, also stamped in access token headers.
    pub signing_key_id: String,
    pub refresh_token_secret: String,
    pub token_leeway_secs: u64,
    /// Deadline for each refresh token store call made while verifying.
    pub store_timeout: Duration,
    pub cookies: CookieSettings,
    pub whitelist_origin: Option<String>,
    pub jwks_max_age_secs: u64,
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub admin_seed: Option<AdminSeed>,
}

impl AuthConfig {
    /// Read the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ApplicationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApplicationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let service_name = var("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());

        let access_token_ttl = Duration::from_secs(parse_or(
            &var,
            "ACCESS_TOKEN_TTL_SECS",
            DEFAULT_ACCESS_TOKEN_TTL_SECS,
        )?);
        let refresh_token_ttl = Duration::from_secs(parse_or(
            &var,
            "REFRESH_TOKEN_TTL_SECS",
            DEFAULT_REFRESH_TOKEN_TTL_SECS,
        )?);
        for (key, ttl) in [
            ("ACCESS_TOKEN_TTL_SECS", access_token_ttl),
            ("REFRESH_TOKEN_TTL_SECS", refresh_token_ttl),
        ] {
            if ttl.is_zero() || ttl.as_secs() > MAX_TOKEN_TTL_SECS {
                return Err(ApplicationError::Configuration(format!(
                    "{key} must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"
                )));
            }
        }

        let private_key_pem = match var("PRIVATE_KEY") {
            // Single-line env values carry escaped newlines
            Some(inline) => inline.replace("\\n", "\n"),
            None => {
                let path =
                    var("PRIVATE_KEY_PATH").unwrap_or_else(|| DEFAULT_PRIVATE_KEY_PATH.to_string());
                std::fs::read_to_string(&path).map_err(|e| {
                    ApplicationError::Configuration(format!(
                        "cannot read private key from {path}: {e}"
                    ))
                })?
            }
        };

        let signing_key_id =
            var("SIGNING_KEY_ID").unwrap_or_else(|| format!("{service_name}-rs256"));

        let refresh_token_secret = var("REFRESH_TOKEN_SECRET").ok_or_else(|| {
            ApplicationError::Configuration("REFRESH_TOKEN_SECRET is not set".into())
        })?;
        if refresh_token_secret.len() < MIN_REFRESH_SECRET_LEN {
            return Err(ApplicationError::Configuration(format!(
                "REFRESH_TOKEN_SECRET must be at least {MIN_REFRESH_SECRET_LEN} bytes"
            )));
        }

        let host: IpAddr = parse_or(&var, "HOST", DEFAULT_HOST)?;
        let port: u16 = parse_or(&var, "PORT", DEFAULT_PORT)?;

        let admin_seed = match (
            var("ADMIN_DEFAULT_FIRSTNAME"),
            var("ADMIN_DEFAULT_LASTNAME"),
            var("ADMIN_DEFAULT_EMAIL"),
            var("ADMIN_DEFAULT_PASSWORD"),
        ) {
            (Some(first_name), Some(last_name), Some(email), Some(password)) => Some(AdminSeed {
                first_name,
                last_name,
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            service_name,
            access_token_ttl,
            refresh_token_ttl,
            private_key_pem,
            signing_key_id,
            refresh_token_secret,
            token_leeway_secs: parse_or(&var, "TOKEN_LEEWAY_SECS", DEFAULT_TOKEN_LEEWAY_SECS)?,
            store_timeout: Duration::from_millis(parse_or(
                &var,
                "STORE_TIMEOUT_MS",
                DEFAULT_STORE_TIMEOUT_MS,
            )?),
            cookies: CookieSettings {
                domain: var("COOKIE_DOMAIN"),
                secure: parse_or(&var, "COOKIE_SECURE", false)?,
            },
            whitelist_origin: var("WHITELIST_ORIGIN"),
            jwks_max_age_secs: parse_or(&var, "JWKS_MAX_AGE_SECS", DEFAULT_JWKS_MAX_AGE_SECS)?,
            bind_addr: SocketAddr::new(host, port),
            database_url: var("DATABASE_URL"),
            admin_seed,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T, ApplicationError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| ApplicationError::Configuration(format!("invalid {key} ({raw}): {e}"))),
        None => Ok(default),
    }
}
