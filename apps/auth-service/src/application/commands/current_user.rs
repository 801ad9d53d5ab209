use crate::AppState;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;

use super::STATUS_SUCCESS;
use crate::application::ApplicationError;
use crate::application::tokens::Identity;

pub async fn handle_current_user_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApplicationError> {
    let user = state.session.current_user(&identity).await?;
    Ok(Json(json!({ "status": STATUS_SUCCESS, "user": user.to_public() })))
}
