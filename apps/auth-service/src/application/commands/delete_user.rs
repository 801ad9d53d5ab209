use crate::AppState;
use axum::{
    Extension,
    Json,
    extract::{Path, State, rejection::PathRejection},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::STATUS_SUCCESS;
use crate::application::ApplicationError;
use crate::application::tokens::Identity;

/// DELETE /api/users/{user_id}. Admin only; every refresh token of the user is revoked.
pub async fn handle_delete_user_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApplicationError> {
    let Path(user_id) = user_id?;

    if !state.session.delete_user(user_id).await? {
        return Err(ApplicationError::NotFound("User not found".into()));
    }
    info!(user_id = %user_id, deleted_by = %identity.user_id, "User deleted");

    Ok(Json(json!({ "status": STATUS_SUCCESS })))
}
