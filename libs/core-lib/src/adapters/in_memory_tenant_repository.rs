use crate::domain::tenant::{NewTenant, Tenant};
use crate::{CoreError, TenantRepository};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory implementation of the TenantRepository port.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantRepository {
    store: Arc<DashMap<Uuid, Tenant>>,
}

impl InMemoryTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenantRepository {
    async fn create(&self, new_tenant: NewTenant) -> Result<Tenant, CoreError> {
        let tenant = new_tenant.into_tenant(Utc::now());
        self.store.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, CoreError> {
        Ok(self.store.get(&id).map(|entry| entry.value().clone()))
    }

    /// Oldest first, matching the Postgres adapter's ordering.
    async fn list(&self) -> Result<Vec<Tenant>, CoreError> {
        let mut tenants: Vec<Tenant> = self
            .store
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tenants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tenants)
    }
}
