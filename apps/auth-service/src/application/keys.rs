//! Signing material: the RS256 key pair for access tokens, the HS256 secret for
//! refresh tokens, and the public JWKS document derived from the RSA key.

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use super::ApplicationError;
use crate::config::AuthConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub n: String,
    pub e: String,
}

impl Jwk {
    fn from_rsa_public_key(public_key: &RsaPublicKey, kid: impl Into<String>) -> Self {
        Self {
            kty: "RSA".to_string(),
            alg: "RS256".to_string(),
            key_use: "sig".to_string(),
            kid: kid.into(),
            n: Base64UrlUnpadded::encode_string(&public_key.n().to_bytes_be()),
            e: Base64UrlUnpadded::encode_string(&public_key.e().to_bytes_be()),
        }
    }
}

/// Read-only after start; shared as `Arc<KeyProvider>`.
pub struct KeyProvider {
    key_id: String,
    signing_key: EncodingKey,
    verifying_key: DecodingKey,
    refresh_signing_key: EncodingKey,
    refresh_verifying_key: DecodingKey,
    jwks: Jwks,
}

impl KeyProvider {
    pub fn from_config(config: &AuthConfig) -> Result<Self, ApplicationError> {
        Self::new(
            &config.private_key_pem,
            config.signing_key_id.clone(),
            config.refresh_token_secret.as_bytes(),
        )
    }

    /// Accepts a PKCS#8 or PKCS#1 PEM private key.
    pub fn new(
        private_key_pem: &str,
        key_id: impl Into<String>,
        refresh_secret: &[u8],
    ) -> Result<Self, ApplicationError> {
        let key_id = key_id.into();
        let private_key = decode_private_key(private_key_pem)?;
        let public_key = RsaPublicKey::from(&private_key);
        let jwk = Jwk::from_rsa_public_key(&public_key, key_id.clone());

        let signing_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| ApplicationError::Configuration(format!("invalid signing key: {e}")))?;
        // Verify with exactly what the JWKS publishes
        let verifying_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| ApplicationError::Configuration(format!("invalid public key: {e}")))?;

        if refresh_secret.is_empty() {
            return Err(ApplicationError::Configuration(
                "refresh token secret is empty".into(),
            ));
        }

        Ok(Self {
            key_id,
            signing_key,
            verifying_key,
            refresh_signing_key: EncodingKey::from_secret(refresh_secret),
            refresh_verifying_key: DecodingKey::from_secret(refresh_secret),
            jwks: Jwks { keys: vec![jwk] },
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// RS256 private key for access tokens.
    pub fn signing_key(&self) -> &EncodingKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> &DecodingKey {
        &self.verifying_key
    }

    /// HS256 secret for refresh tokens.
    pub fn refresh_secret(&self) -> &EncodingKey {
        &self.refresh_signing_key
    }

    pub fn refresh_verifying_key(&self) -> &DecodingKey {
        &self.refresh_verifying_key
    }

    pub fn jwks(&self) -> &Jwks {
        &self.jwks
    }
}

fn decode_private_key(pem: &str) -> Result<RsaPrivateKey, ApplicationError> {
    let pem = pem.trim();
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    if let Ok(key) = RsaPrivateKey::from_pkcs1_pem(pem) {
        return Ok(key);
    }
    Err(ApplicationError::Configuration(
        "private key is not a PKCS#8 or PKCS#1 RSA PEM".into(),
    ))
}
