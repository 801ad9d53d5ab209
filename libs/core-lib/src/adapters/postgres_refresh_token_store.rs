use crate::domain::refresh_token::RefreshTokenRecord;
use crate::{CoreError, RefreshTokenStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL implementation of the RefreshTokenStore port.
#[derive(Debug, Clone)]
pub struct PostgresRefreshTokenStore {
    pool: PgPool,
}

impl PostgresRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PostgresRefreshTokenStore {
    async fn persist(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, CoreError> {
        let record = RefreshTokenRecord::new(user_id, expires_at, Utc::now());
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_live(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, CoreError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT id, user_id, expires_at, created_at FROM refresh_tokens \
             WHERE id = $1 AND user_id = $2 AND expires_at > NOW()",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected() > 0;
        debug!(token_id = %id, removed, "Refresh token delete");
        Ok(removed)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        debug!(user_id = %user_id, removed = result.rows_affected(), "Refresh tokens purged for user");
        Ok(result.rows_affected())
    }
}
