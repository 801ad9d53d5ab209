use crate::AppState;
use axum::{
    Extension,
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use core_lib::TenantRepository;
use core_lib::domain::tenant::{NewTenant, Tenant};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::application::ApplicationError;
use crate::application::tokens::Identity;

pub struct CreateTenantHandler {
    tenant_repository: Arc<dyn TenantRepository>,
}

impl CreateTenantHandler {
    pub fn new(tenant_repository: Arc<dyn TenantRepository>) -> Self {
        Self { tenant_repository }
    }

    pub async fn handle(&self, dto: CreateTenantDto) -> Result<Tenant, ApplicationError> {
        let new_tenant = NewTenant::new(&dto.name, &dto.address)?;
        Ok(self.tenant_repository.create(new_tenant).await?)
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateTenantDto {
    pub name: String,
    pub address: String,
}

// --- Axum Route Handler ---

/// Guarded by `authenticate` + `role_guard(admin)`.
pub async fn handle_create_tenant_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateTenantDto>, JsonRejection>,
) -> Result<impl IntoResponse, ApplicationError> {
    let Json(payload) = payload?;
    let handler = CreateTenantHandler::new(state.tenant_repo.clone());
    let tenant = handler.handle(payload).await?;
    info!(tenant_id = %tenant.id, created_by = %identity.user_id, "Tenant created");

    Ok((StatusCode::CREATED, Json(tenant)))
}
