use crate::AppState;
use axum::{
    Extension,
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::IntoResponse,
};
use core_lib::domain::user::Role;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::STATUS_SUCCESS;
use crate::application::ApplicationError;
use crate::application::tokens::Identity;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRoleDto {
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
}

/// PATCH /api/users/{user_id}. Admin only.
pub async fn handle_update_user_role_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    user_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRoleDto>, JsonRejection>,
) -> Result<impl IntoResponse, ApplicationError> {
    let Path(user_id) = user_id?;
    let Json(payload) = payload?;

    let user = state
        .session
        .change_role(user_id, payload.role, payload.tenant_id)
        .await?;
    info!(user_id = %user.id, updated_by = %identity.user_id, "User updated");

    Ok(Json(json!({ "status": STATUS_SUCCESS, "id": user.id })))
}
