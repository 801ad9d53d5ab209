use crate::AppState;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;

use super::{STATUS_SUCCESS, cleared_cookies};
use crate::application::ApplicationError;
use crate::application::verifier::RefreshIdentity;

pub async fn handle_logout_request(
    State(state): State<AppState>,
    Extension(refresh): Extension<RefreshIdentity>,
) -> Result<impl IntoResponse, ApplicationError> {
    state.session.logout(&refresh).await?;

    Ok((
        cleared_cookies(&state)?,
        Json(json!({ "status": STATUS_SUCCESS, "message": "You have been logged out" })),
    ))
}
