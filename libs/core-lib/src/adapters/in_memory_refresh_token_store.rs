use crate::domain::refresh_token::RefreshTokenRecord;
use crate::{CoreError, RefreshTokenStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory refresh token records keyed by token id.
///
/// `DashMap::remove` is atomic per key, so of two racing deletes exactly one observes the record.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    store: Arc<DashMap<Uuid, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn persist(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, CoreError> {
        let record = RefreshTokenRecord::new(user_id, expires_at, Utc::now());
        self.store.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_live(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, CoreError> {
        let now = Utc::now();
        Ok(self
            .store
            .get(&id)
            .map(|entry| entry.value().clone())
            .filter(|record| record.user_id == user_id && record.is_live_at(now)))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CoreError> {
        Ok(self.store.remove(&id).is_some())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, CoreError> {
        let mut removed = 0u64;
        self.store.retain(|_, record| {
            if record.user_id == user_id {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}
