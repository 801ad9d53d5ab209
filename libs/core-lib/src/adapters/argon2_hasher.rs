use crate::{CoreError, CredentialHasher};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Argon2id password hashing. Digests are PHC strings and carry their own parameters,
/// so a hasher with any cost can verify digests produced with another.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom cost (memory in KiB, iterations, lanes). Tests use this to keep hashing cheap.
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, CoreError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| CoreError::Configuration(format!("invalid argon2 params: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, CoreError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|digest| digest.to_string())
            .map_err(|e| CoreError::Internal(format!("password hashing failed: {e}")))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Hasher {
        Argon2Hasher::with_cost(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = cheap();
        let digest = hasher.hash("correct horse").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &digest));
        assert!(!hasher.verify("wrong horse", &digest));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = cheap();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_digest_does_not_verify() {
        let hasher = cheap();
        assert!(!hasher.verify("anything", "not-a-phc-string"));
        assert!(!hasher.verify("anything", ""));
    }

    #[test]
    fn test_default_cost_verifies_cheap_digest() {
        let digest = cheap().hash("portable").unwrap();
        assert!(Argon2Hasher::new().verify("portable", &digest));
    }

    #[test]
    fn test_invalid_cost_rejected() {
        assert!(matches!(
            Argon2Hasher::with_cost(1, 0, 0),
            Err(CoreError::Configuration(_))
        ));
    }
}
