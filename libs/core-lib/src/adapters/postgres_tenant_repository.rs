use crate::domain::tenant::{NewTenant, Tenant};
use crate::{CoreError, TenantRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the TenantRepository port.
#[derive(Debug, Clone)]
pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn create(&self, new_tenant: NewTenant) -> Result<Tenant, CoreError> {
        let tenant = new_tenant.into_tenant(Utc::now());
        sqlx::query(
            "INSERT INTO tenants (id, name, address, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.address)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(tenant)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, CoreError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, address, created_at, updated_at FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    async fn list(&self) -> Result<Vec<Tenant>, CoreError> {
        let tenants = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, address, created_at, updated_at FROM tenants ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }
}
