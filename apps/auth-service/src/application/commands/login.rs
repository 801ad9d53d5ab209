use crate::AppState;
use axum::{Json, extract::{State, rejection::JsonRejection}, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use super::{STATUS_SUCCESS, session_cookies};
use crate::application::ApplicationError;

#[derive(Deserialize, Debug)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

pub async fn handle_login_request(
    State(state): State<AppState>,
    payload: Result<Json<LoginDto>, JsonRejection>,
) -> Result<impl IntoResponse, ApplicationError> {
    let Json(payload) = payload?;
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApplicationError::Validation(
            "Email and password are required".into(),
        ));
    }

    let (user, tokens) = state.session.login(email, &payload.password).await?;

    Ok((
        session_cookies(&state, &tokens)?,
        Json(json!({ "status": STATUS_SUCCESS, "user": user.to_public() })),
    ))
}
