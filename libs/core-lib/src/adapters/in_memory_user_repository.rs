use crate::domain::user::{tenant_for_role, NewUser, Role, User};
use crate::{CoreError, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory implementation of the UserRepository port for testing and single-executable mode.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<DashMap<Uuid, User>>,
    // Email -> user id, the uniqueness index
    emails: Arc<DashMap<String, Uuid>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, CoreError> {
        // Holding the index entry serializes concurrent registrations of the same email
        match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(CoreError::AlreadyExists(format!(
                "user with email {}",
                new_user.email
            ))),
            Entry::Vacant(slot) => {
                let user = new_user.into_user(Utc::now());
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CoreError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn exists_with_role(&self, role: Role) -> Result<bool, CoreError> {
        Ok(self.users.iter().any(|entry| entry.value().role == role))
    }

    async fn update_role(
        &self,
        id: Uuid,
        role: Role,
        tenant_id: Option<Uuid>,
    ) -> Result<User, CoreError> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("user {id}")))?;
        let user = entry.value_mut();
        user.role = role;
        user.tenant_id = tenant_for_role(role, tenant_id);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CoreError> {
        match self.users.remove(&id) {
            Some((_, user)) => {
                self.emails.remove(&user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser::new("Jane", "Doe", email, "hash", role, None)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryUserRepository::new();
        let created = repo
            .create(new_user("jane@example.com", Role::Customer))
            .await
            .unwrap();

        let by_id = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        let by_email = repo.find_by_email("jane@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.password_hash, "hash");

        assert!(repo.find_by_email("JANE@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("dup@example.com", Role::Customer))
            .await
            .unwrap();

        let result = repo.create(new_user("dup@example.com", Role::Admin)).await;
        assert!(matches!(result, Err(CoreError::AlreadyExists(_))));
        assert_eq!(repo.users.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registration_yields_one_user() {
        let repo = InMemoryUserRepository::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.create(new_user("race@example.com", Role::Customer)).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(repo.users.len(), 1);
    }

    #[tokio::test]
    async fn test_update_role_and_tenant() {
        let repo = InMemoryUserRepository::new();
        let user = repo
            .create(new_user("promote@example.com", Role::Customer))
            .await
            .unwrap();
        let tenant = Uuid::new_v4();

        let manager = repo
            .update_role(user.id, Role::Manager, Some(tenant))
            .await
            .unwrap();
        assert_eq!(manager.role, Role::Manager);
        assert_eq!(manager.tenant_id, Some(tenant));

        let admin = repo
            .update_role(user.id, Role::Admin, Some(tenant))
            .await
            .unwrap();
        assert_eq!(admin.tenant_id, None);

        let missing = repo.update_role(Uuid::new_v4(), Role::Admin, None).await;
        assert!(matches!(missing, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_exists_with_role_and_delete() {
        let repo = InMemoryUserRepository::new();
        assert!(!repo.exists_with_role(Role::Admin).await.unwrap());

        let admin = repo
            .create(new_user("admin@example.com", Role::Admin))
            .await
            .unwrap();
        assert!(repo.exists_with_role(Role::Admin).await.unwrap());

        assert!(repo.delete(admin.id).await.unwrap());
        assert!(!repo.delete(admin.id).await.unwrap());
        assert!(!repo.exists_with_role(Role::Admin).await.unwrap());

        // Email is free again after deletion
        repo.create(new_user("admin@example.com", Role::Customer))
            .await
            .unwrap();
    }
}
