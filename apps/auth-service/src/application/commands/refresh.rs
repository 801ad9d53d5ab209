use crate::AppState;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;

use super::{STATUS_SUCCESS, session_cookies};
use crate::application::ApplicationError;
use crate::application::verifier::RefreshIdentity;

/// Runs behind `validate_refresh_token`, so the record is known to be live.
pub async fn handle_refresh_request(
    State(state): State<AppState>,
    Extension(refresh): Extension<RefreshIdentity>,
) -> Result<impl IntoResponse, ApplicationError> {
    let (user_id, tokens) = state.session.refresh(&refresh).await?;

    Ok((
        session_cookies(&state, &tokens)?,
        Json(json!({ "status": STATUS_SUCCESS, "id": user_id })),
    ))
}
