use crate::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use core_lib::domain::user::Role;
use serde::Deserialize;
use serde_json::json;

use super::{STATUS_SUCCESS, session_cookies};
use crate::application::ApplicationError;
use crate::application::session::Registration;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserDto {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterUserDto {
    /// Public sign-up always yields a customer.
    pub fn into_registration(self) -> Result<Registration, ApplicationError> {
        let email = self.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(ApplicationError::Validation(
                "Email must be a valid email address".into(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApplicationError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(Registration {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email,
            password: self.password,
            role: Role::Customer,
            tenant_id: None,
        })
    }
}

// --- Axum Route Handler ---

pub async fn handle_register_user_request(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserDto>, JsonRejection>,
) -> Result<impl IntoResponse, ApplicationError> {
    let Json(payload) = payload?;
    let registration = payload.into_registration()?;
    let (user, tokens) = state.session.register(registration).await?;

    Ok((
        StatusCode::CREATED,
        session_cookies(&state, &tokens)?,
        Json(json!({ "status": STATUS_SUCCESS, "user": user.to_public() })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(email: &str, password: &str) -> RegisterUserDto {
        RegisterUserDto {
            first_name: " Ada ".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_into_registration_trims() {
        let registration = dto("  a@b.com ", "longenough1").into_registration().unwrap();
        assert_eq!(registration.email, "a@b.com");
        assert_eq!(registration.first_name, "Ada");
        assert_eq!(registration.role, Role::Customer);
    }

    #[test]
    fn test_into_registration_rejects_bad_input() {
        assert!(matches!(
            dto("not-an-email", "longenough1").into_registration(),
            Err(ApplicationError::Validation(_))
        ));
        assert!(matches!(
            dto("a@b.com", "short").into_registration(),
            Err(ApplicationError::Validation(_))
        ));
    }
}
