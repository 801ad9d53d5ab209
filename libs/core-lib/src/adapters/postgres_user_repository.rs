use crate::domain::user::{tenant_for_role, NewUser, Role, User};
use crate::{CoreError, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, role, tenant_id, created_at, updated_at";

// Row shape matching the users table
#[derive(sqlx::FromRow, Debug)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    tenant_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            tenant_id: row.tenant_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL implementation of the UserRepository port using sqlx.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, CoreError> {
        let email = new_user.email.clone();
        let user = new_user.into_user(Utc::now());
        let query = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {USER_COLUMNS}"
        );

        let row: UserRow = sqlx::query_as(&query)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.tenant_id)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    CoreError::AlreadyExists(format!("user with email {email}"))
                }
                other => CoreError::from(other),
            })?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn exists_with_role(&self, role: Role) -> Result<bool, CoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = $1)")
                .bind(role.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn update_role(
        &self,
        id: Uuid,
        role: Role,
        tenant_id: Option<Uuid>,
    ) -> Result<User, CoreError> {
        let query = format!(
            "UPDATE users SET role = $2, tenant_id = $3, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(id)
            .bind(role.as_str())
            .bind(tenant_for_role(role, tenant_id))
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| CoreError::NotFound(format!("user {id}")))?
            .try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- Integration Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::postgres_refresh_token_store::PostgresRefreshTokenStore;
    use crate::adapters::postgres_tenant_repository::PostgresTenantRepository;
    use crate::adapters::postgres_test_support::setup_db;
    use crate::domain::tenant::NewTenant;
    use crate::{RefreshTokenStore, TenantRepository};
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser::new("Jane", "Doe", email, "hash", Role::Customer, None)
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_create_and_find_user() {
        let (pool, _node) = setup_db().await;
        let repo = PostgresUserRepository::new(pool);

        let created = repo.create(new_user("pg@example.com")).await.unwrap();
        let by_email = repo.find_by_email("pg@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.role, Role::Customer);
        assert_eq!(by_email.password_hash, "hash");

        let by_id = repo.find_by_id(created.id).await.unwrap();
        assert!(by_id.is_some());
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_duplicate_email_maps_to_already_exists() {
        let (pool, _node) = setup_db().await;
        let repo = PostgresUserRepository::new(pool);

        repo.create(new_user("dup@example.com")).await.unwrap();
        let result = repo.create(new_user("dup@example.com")).await;
        assert!(matches!(result, Err(CoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_update_role_keeps_tenant_only_for_manager() {
        let (pool, _node) = setup_db().await;
        let users = PostgresUserRepository::new(pool.clone());
        let tenants = PostgresTenantRepository::new(pool);

        let tenant = tenants
            .create(NewTenant::new("Pizza Place", "1 Main St").unwrap())
            .await
            .unwrap();
        let user = users.create(new_user("mgr@example.com")).await.unwrap();

        let manager = users
            .update_role(user.id, Role::Manager, Some(tenant.id))
            .await
            .unwrap();
        assert_eq!(manager.tenant_id, Some(tenant.id));
        assert!(users.exists_with_role(Role::Manager).await.unwrap());

        let customer = users
            .update_role(user.id, Role::Customer, Some(tenant.id))
            .await
            .unwrap();
        assert_eq!(customer.tenant_id, None);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_delete_cascades_refresh_tokens() {
        let (pool, _node) = setup_db().await;
        let users = PostgresUserRepository::new(pool.clone());
        let store = PostgresRefreshTokenStore::new(pool);

        let user = users.create(new_user("gone@example.com")).await.unwrap();
        let record = store
            .persist(user.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        assert!(users.delete(user.id).await.unwrap());
        assert!(!users.delete(user.id).await.unwrap());
        assert!(store.find_live(record.id, user.id).await.unwrap().is_none());
    }
}
