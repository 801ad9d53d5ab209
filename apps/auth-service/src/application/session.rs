use chrono::Utc;
use core_lib::domain::user::{NewUser, Role, User};
use core_lib::{CoreError, CredentialHasher, RefreshTokenStore, UserRepository};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::ApplicationError;
use super::tokens::{Identity, TokenIssuer};
use super::verifier::RefreshIdentity;

/// A freshly minted token pair. `refresh_token_id` is the persisted record behind the refresh token.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_token_id: Uuid,
}

/// Already shape-checked registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

/// Sequences hashing, issuing, persisting and revoking for the session endpoints.
pub struct SessionOrchestrator {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    hasher: Arc<dyn CredentialHasher>,
    issuer: Arc<TokenIssuer>,
    /// Deadline for each refresh token store call.
    store_timeout: Duration,
}

impl SessionOrchestrator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        hasher: Arc<dyn CredentialHasher>,
        issuer: Arc<TokenIssuer>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            hasher,
            issuer,
            store_timeout,
        }
    }

    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<(User, SessionTokens), ApplicationError> {
        let user = self.create_user(registration).await?;
        info!(user_id = %user.id, "User has been registered");

        let tokens = self.issue_session_for(&user).await?;
        Ok((user, tokens))
    }

    /// Creates the user record only. Duplicate email is a Conflict.
    pub async fn create_user(&self, registration: Registration) -> Result<User, ApplicationError> {
        if self
            .users
            .find_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(ApplicationError::Conflict("Email is already registered".into()));
        }

        let password_hash = self.hash_password(registration.password).await?;
        let new_user = NewUser::new(
            registration.first_name,
            registration.last_name,
            registration.email,
            password_hash,
            registration.role,
            registration.tenant_id,
        );

        // The store's uniqueness check still decides a concurrent race
        Ok(self.users.create(new_user).await?)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, SessionTokens), ApplicationError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            info!("Login rejected: unknown email");
            return Err(ApplicationError::InvalidCredentials);
        };

        if !self
            .verify_password(password.to_string(), user.password_hash.clone())
            .await?
        {
            info!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(ApplicationError::InvalidCredentials);
        }

        let tokens = self.issue_session_for(&user).await?;
        info!(user_id = %user.id, "User has been logged in");
        Ok((user, tokens))
    }

    /// Mint an access token, persist a refresh record, then mint the refresh token naming it.
    pub async fn issue_session_for(&self, user: &User) -> Result<SessionTokens, ApplicationError> {
        self.issue_for_identity(&Identity::from(user)).await
    }

    async fn issue_for_identity(
        &self,
        identity: &Identity,
    ) -> Result<SessionTokens, ApplicationError> {
        let access_token = self.issuer.issue_access_token(identity)?;

        let expires_at = self.issuer.refresh_expiry(Utc::now())?;
        let record = self
            .with_deadline(
                "persist",
                self.refresh_tokens.persist(identity.user_id, expires_at),
            )
            .await?;
        let refresh_token = self.issuer.issue_refresh_token(identity, &record)?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
            refresh_token_id: record.id,
        })
    }

    /// Rotate a verified refresh token. The new record is created before the old one is
    /// deleted; if the old one was already gone another request rotated it first, so the
    /// new record is dropped and the call is rejected.
    pub async fn refresh(
        &self,
        verified: &RefreshIdentity,
    ) -> Result<(Uuid, SessionTokens), ApplicationError> {
        let user_id = verified.identity.user_id;
        if self.users.find_by_id(user_id).await?.is_none() {
            warn!(user_id = %user_id, "Refresh rejected: user no longer exists");
            return Err(ApplicationError::Unauthenticated("unknown subject".into()));
        }

        let tokens = self.issue_for_identity(&verified.identity).await?;

        match self
            .with_deadline("delete", self.refresh_tokens.delete(verified.token_id))
            .await
        {
            Ok(true) => {
                info!(user_id = %user_id, "Refresh token rotated");
                Ok((user_id, tokens))
            }
            Ok(false) => {
                warn!(user_id = %user_id, token_id = %verified.token_id, "Refresh token reused during rotation");
                self.discard(tokens.refresh_token_id).await;
                Err(ApplicationError::Unauthenticated(
                    "refresh token already rotated".into(),
                ))
            }
            Err(e) => {
                self.discard(tokens.refresh_token_id).await;
                Err(e)
            }
        }
    }

    /// Revoke the refresh record named by the cookie. Succeeds whether or not it still existed.
    pub async fn logout(&self, refresh: &RefreshIdentity) -> Result<(), ApplicationError> {
        let removed = self.revoke(refresh.token_id).await?;
        info!(
            user_id = %refresh.identity.user_id,
            removed,
            "User has been logged out"
        );
        Ok(())
    }

    pub async fn revoke(&self, refresh_token_id: Uuid) -> Result<bool, ApplicationError> {
        self.with_deadline("delete", self.refresh_tokens.delete(refresh_token_id))
            .await
    }

    pub async fn current_user(&self, identity: &Identity) -> Result<User, ApplicationError> {
        self.users
            .find_by_id(identity.user_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound("User not found".into()))
    }

    /// Change a user's role (tenant kept only for managers). Outstanding refresh tokens
    /// still carry the old role, so they are revoked and the user signs in again.
    pub async fn change_role(
        &self,
        user_id: Uuid,
        role: Role,
        tenant_id: Option<Uuid>,
    ) -> Result<User, ApplicationError> {
        let user = match self.users.update_role(user_id, role, tenant_id).await {
            Ok(user) => user,
            Err(CoreError::NotFound(_)) => {
                return Err(ApplicationError::NotFound("User not found".into()));
            }
            Err(e) => return Err(e.into()),
        };
        let revoked = self
            .with_deadline(
                "delete_all_for_user",
                self.refresh_tokens.delete_all_for_user(user_id),
            )
            .await?;
        info!(user_id = %user_id, role = %user.role, revoked, "User role changed");
        Ok(user)
    }

    /// Remove a user together with every refresh record it owns.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<bool, ApplicationError> {
        let revoked = self
            .with_deadline(
                "delete_all_for_user",
                self.refresh_tokens.delete_all_for_user(user_id),
            )
            .await?;
        let deleted = self.users.delete(user_id).await?;
        info!(user_id = %user_id, revoked, deleted, "User removed");
        Ok(deleted)
    }

    async fn discard(&self, refresh_token_id: Uuid) {
        if let Err(e) = self.revoke(refresh_token_id).await {
            warn!(token_id = %refresh_token_id, error = %e, "Failed to discard refresh record");
        }
    }

    async fn with_deadline<T, F>(&self, operation: &str, call: F) -> Result<T, ApplicationError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Refresh token store timed out"
                );
                Err(ApplicationError::Internal(format!(
                    "refresh token store timed out during {operation}"
                )))
            }
        }
    }

    // CPU-bound, runs on the blocking pool
    async fn hash_password(&self, password: String) -> Result<String, ApplicationError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApplicationError::Internal(format!("hashing task failed: {e}")))?
            .map_err(ApplicationError::from)
    }

    async fn verify_password(
        &self,
        password: String,
        digest: String,
    ) -> Result<bool, ApplicationError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| ApplicationError::Internal(format!("verification task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::keys::KeyProvider;
    use async_trait::async_trait;
    use chrono::DateTime;
    use core_lib::adapters::argon2_hasher::Argon2Hasher;
    use core_lib::adapters::in_memory_refresh_token_store::InMemoryRefreshTokenStore;
    use core_lib::adapters::in_memory_user_repository::InMemoryUserRepository;
    use core_lib::domain::refresh_token::RefreshTokenRecord;

    const TEST_KEY: &str = include_str!("../../tests/fixtures/private_key.pem");

    struct Fixture {
        session: Arc<SessionOrchestrator>,
        users: Arc<InMemoryUserRepository>,
        store: Arc<InMemoryRefreshTokenStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        fixture_with(store.clone(), store, Duration::from_secs(1))
    }

    fn fixture_with(
        store_port: Arc<dyn RefreshTokenStore>,
        store: Arc<InMemoryRefreshTokenStore>,
        store_timeout: Duration,
    ) -> Fixture {
        let keys = Arc::new(
            KeyProvider::new(TEST_KEY, "kid", b"0123456789abcdef0123456789abcdef").unwrap(),
        );
        let issuer = Arc::new(TokenIssuer::new(
            keys,
            "auth-service",
            Duration::from_secs(3600),
            Duration::from_secs(86_400),
        ));
        let users = Arc::new(InMemoryUserRepository::new());
        let hasher = Arc::new(Argon2Hasher::with_cost(1024, 1, 1).unwrap());
        Fixture {
            session: Arc::new(SessionOrchestrator::new(
                users.clone(),
                store_port,
                hasher,
                issuer,
                store_timeout,
            )),
            users,
            store,
        }
    }

    fn registration(email: &str) -> Registration {
        Registration {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: "longenough1".into(),
            role: Role::Customer,
            tenant_id: None,
        }
    }

    fn verified(user: &User, tokens: &SessionTokens) -> RefreshIdentity {
        RefreshIdentity {
            identity: Identity::from(user),
            token_id: tokens.refresh_token_id,
        }
    }

    #[tokio::test]
    async fn test_register_hashes_and_persists_one_record() {
        let f = fixture();
        let (user, tokens) = f.session.register(registration("a@b.com")).await.unwrap();

        assert_ne!(user.password_hash, "longenough1");
        assert_eq!(user.role, Role::Customer);
        assert_eq!(f.store.len(), 1);
        assert!(
            f.store
                .find_live(tokens.refresh_token_id, user.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let f = fixture();
        f.session.register(registration("a@b.com")).await.unwrap();
        let result = f.session.register(registration("a@b.com")).await;

        assert!(matches!(result, Err(ApplicationError::Conflict(_))));
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_login_errors_are_indistinguishable() {
        let f = fixture();
        f.session.register(registration("a@b.com")).await.unwrap();

        let wrong_password = f.session.login("a@b.com", "nope-nope").await;
        let unknown_email = f.session.login("x@y.com", "longenough1").await;
        assert!(matches!(wrong_password, Err(ApplicationError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(ApplicationError::InvalidCredentials)));
        assert_eq!(f.store.len(), 1);

        let (user, _) = f.session.login("a@b.com", "longenough1").await.unwrap();
        assert_eq!(user.email, "a@b.com");
        assert_eq!(f.store.len(), 2);
    }

    #[tokio::test]
    async fn test_sequential_refreshes_leave_one_live_record() {
        let f = fixture();
        let (user, mut tokens) = f.session.register(registration("a@b.com")).await.unwrap();

        for _ in 0..5 {
            let old = tokens.refresh_token_id;
            let (id, next) = f.session.refresh(&verified(&user, &tokens)).await.unwrap();
            assert_eq!(id, user.id);
            assert_ne!(next.refresh_token_id, old);
            assert!(f.store.find_live(old, user.id).await.unwrap().is_none());
            tokens = next;
        }
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_replayed_rotation_is_rejected() {
        let f = fixture();
        let (user, tokens) = f.session.register(registration("a@b.com")).await.unwrap();
        let stale = verified(&user, &tokens);

        let first = f.session.refresh(&stale).await;
        let second = f.session.refresh(&stale).await;

        assert!(first.is_ok());
        assert!(matches!(second, Err(ApplicationError::Unauthenticated(_))));
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotation_has_single_successor() {
        let f = fixture();
        let (user, tokens) = f.session.register(registration("a@b.com")).await.unwrap();
        let stale = verified(&user, &tokens);

        let (a, b) = tokio::join!(f.session.refresh(&stale), f.session.refresh(&stale));
        assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(f.store.len(), 1);

        // Same race across worker threads
        let (_, next) = a.or(b).unwrap();
        let stale = verified(&user, &next);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = f.session.clone();
                tokio::spawn(async move { session.refresh(&stale).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert!(matches!(e, ApplicationError::Unauthenticated(_))),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(f.store.len(), 1);
    }

    /// Persists normally; deletes never finish.
    struct SlowDeleteStore {
        inner: Arc<InMemoryRefreshTokenStore>,
    }

    #[async_trait]
    impl RefreshTokenStore for SlowDeleteStore {
        async fn persist(
            &self,
            user_id: Uuid,
            expires_at: DateTime<Utc>,
        ) -> Result<RefreshTokenRecord, CoreError> {
            self.inner.persist(user_id, expires_at).await
        }
        async fn find_live(
            &self,
            id: Uuid,
            user_id: Uuid,
        ) -> Result<Option<RefreshTokenRecord>, CoreError> {
            self.inner.find_live(id, user_id).await
        }
        async fn delete(&self, _id: Uuid) -> Result<bool, CoreError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(true)
        }
        async fn delete_all_for_user(&self, _user_id: Uuid) -> Result<u64, CoreError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_rotation_store_calls_have_deadline() {
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let f = fixture_with(
            Arc::new(SlowDeleteStore {
                inner: store.clone(),
            }),
            store,
            Duration::from_millis(50),
        );
        let (user, tokens) = f.session.register(registration("a@b.com")).await.unwrap();
        let refresh = verified(&user, &tokens);

        let rotated = tokio::time::timeout(Duration::from_secs(5), f.session.refresh(&refresh))
            .await
            .expect("refresh should hit the store deadline");
        assert!(matches!(rotated, Err(ApplicationError::Internal(_))));

        let logout = tokio::time::timeout(Duration::from_secs(5), f.session.logout(&refresh))
            .await
            .expect("logout should hit the store deadline");
        assert!(matches!(logout, Err(ApplicationError::Internal(_))));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user_rejected() {
        let f = fixture();
        let (user, tokens) = f.session.register(registration("a@b.com")).await.unwrap();
        f.users.delete(user.id).await.unwrap();

        let result = f.session.refresh(&verified(&user, &tokens)).await;
        assert!(matches!(result, Err(ApplicationError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let f = fixture();
        let (user, tokens) = f.session.register(registration("a@b.com")).await.unwrap();
        let refresh = verified(&user, &tokens);

        f.session.logout(&refresh).await.unwrap();
        f.session.logout(&refresh).await.unwrap();
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_revokes_all_records() {
        let f = fixture();
        let (user, _) = f.session.register(registration("a@b.com")).await.unwrap();
        f.session.login("a@b.com", "longenough1").await.unwrap();
        assert_eq!(f.store.len(), 2);

        assert!(f.session.delete_user(user.id).await.unwrap());
        assert!(f.store.is_empty());
        assert!(matches!(
            f.session.current_user(&Identity::from(&user)).await,
            Err(ApplicationError::NotFound(_))
        ));
    }
}
