use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

// --- Tenant ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub address: String,
}

impl NewTenant {
    /// Trims both fields and rejects empty ones.
    pub fn new(name: &str, address: &str) -> Result<Self, CoreError> {
        let name = name.trim();
        let address = address.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("Tenant name cannot be empty".into()));
        }
        if address.is_empty() {
            return Err(CoreError::Validation(
                "Tenant address cannot be empty".into(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            address: address.to_string(),
        })
    }

    pub fn into_tenant(self, now: DateTime<Utc>) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: self.name,
            address: self.address,
            created_at: now,
            updated_at: now,
        }
    }
}
