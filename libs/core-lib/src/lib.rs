use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use uuid::Uuid;

// Declare modules
pub mod adapters;
pub mod domain;

use domain::refresh_token::RefreshTokenRecord;
use domain::tenant::{NewTenant, Tenant};
use domain::user::{NewUser, Role, User};

// Define a common error type for the core library
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Record already exists: {0}")]
    AlreadyExists(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Infrastructure error: {0}")]
    Infrastructure(#[from] Box<dyn StdError + Send + Sync>),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Infrastructure(Box::new(err))
    }
}

// Port for the user records
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. A duplicate email yields `CoreError::AlreadyExists`.
    async fn create(&self, new_user: NewUser) -> Result<User, CoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CoreError>;

    /// Lookup by exact (case-sensitive) email. The returned record carries the password hash.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, CoreError>;

    async fn exists_with_role(&self, role: Role) -> Result<bool, CoreError>;

    /// Change role and tenant reference. Tenant is dropped for any role other than manager.
    async fn update_role(
        &self,
        id: Uuid,
        role: Role,
        tenant_id: Option<Uuid>,
    ) -> Result<User, CoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, CoreError>;
}

// Port for tenants
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, new_tenant: NewTenant) -> Result<Tenant, CoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, CoreError>;
    async fn list(&self) -> Result<Vec<Tenant>, CoreError>;
}

/// Port for the persisted half of refresh tokens.
///
/// Every method is a single-row operation keyed by the record id (or owner), so
/// adapters rely on the backing store's per-row atomicity and take no extra locks.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Create a record with a server-generated id. Fails only when the store is unavailable.
    async fn persist(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, CoreError>;

    /// Returns the record only if it exists, belongs to `user_id` and has not expired.
    /// A wrong owner is indistinguishable from a missing record.
    async fn find_live(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, CoreError>;

    /// Idempotent. Returns `true` only for the call that actually removed the record.
    async fn delete(&self, id: Uuid) -> Result<bool, CoreError>;

    /// Remove every record owned by `user_id`, returning how many were removed.
    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, CoreError>;
}

/// One-way password hashing capability.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, CoreError>;

    /// Never errors: malformed digests simply do not verify.
    fn verify(&self, plaintext: &str, digest: &str) -> bool;
}
