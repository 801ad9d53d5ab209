use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
    http::header,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use super::ApplicationError;
use crate::AppState;

/// GET /api/tenants
pub async fn handle_list_tenants(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApplicationError> {
    let tenants = state.tenant_repo.list().await?;
    Ok(Json(json!({ "status": "success", "data": tenants })))
}

/// GET /api/tenants/{tenant_id}
pub async fn handle_get_tenant(
    State(state): State<AppState>,
    tenant_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApplicationError> {
    let Path(tenant_id) = tenant_id?;
    let tenant = state
        .tenant_repo
        .find_by_id(tenant_id)
        .await?
        .ok_or_else(|| ApplicationError::NotFound("Tenant not found".into()))?;
    Ok(Json(tenant))
}

/// GET /.well-known/jwks.json
pub async fn handle_jwks(State(state): State<AppState>) -> impl IntoResponse {
    let cache_control = format!("public, max-age={}", state.config.jwks_max_age_secs);
    (
        [(header::CACHE_CONTROL, cache_control)],
        Json(state.keys.jwks().clone()),
    )
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn root() -> &'static str {
    "Welcome to the auth service"
}
