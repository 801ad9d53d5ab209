use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use core_lib::CoreError;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

// Declare sub-modules within the application layer
pub mod authz;
pub mod bootstrap;
pub mod commands;
pub mod cookies;
pub mod keys;
pub mod middleware;
pub mod query;
pub mod session;
pub mod tokens;
pub mod verifier;

const NOT_AUTHORIZED: &str = "You are not authorized";
const INVALID_CREDENTIALS: &str = "Email or Password is incorrect";

// Top-level error type for the application layer
#[derive(thiserror::Error, Debug)]
pub enum ApplicationError {
    /// Missing, malformed, expired or revoked token. Never says which.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown email and wrong password are the same error.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Configuration Error: {0}")]
    Configuration(String),

    #[error("Internal Application Error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApplicationError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => ApplicationError::NotFound(msg),
            CoreError::AlreadyExists(msg) => ApplicationError::Conflict(msg),
            CoreError::Validation(msg) => ApplicationError::Validation(msg),
            CoreError::Unauthorized(msg) => ApplicationError::Unauthenticated(msg),
            CoreError::Configuration(msg) => ApplicationError::Configuration(msg),
            CoreError::Infrastructure(e) => ApplicationError::Internal(e.to_string()),
            CoreError::Internal(msg) => ApplicationError::Internal(msg),
        }
    }
}

// Malformed bodies and path parameters use the same error envelope as everything else
impl From<JsonRejection> for ApplicationError {
    fn from(rejection: JsonRejection) -> Self {
        ApplicationError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApplicationError {
    fn from(rejection: PathRejection) -> Self {
        ApplicationError::Validation(rejection.body_text())
    }
}

impl ApplicationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApplicationError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApplicationError::Forbidden => StatusCode::FORBIDDEN,
            ApplicationError::Conflict(_) => StatusCode::CONFLICT,
            ApplicationError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApplicationError::NotFound(_) => StatusCode::NOT_FOUND,
            ApplicationError::Validation(_) => StatusCode::BAD_REQUEST,
            ApplicationError::Configuration(_) | ApplicationError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApplicationError::Unauthenticated(_) => "UnauthorizedError",
            ApplicationError::Forbidden => "ForbiddenError",
            ApplicationError::Conflict(_) => "ConflictError",
            ApplicationError::InvalidCredentials => "BadRequestError",
            ApplicationError::NotFound(_) => "NotFoundError",
            ApplicationError::Validation(_) => "ValidationError",
            ApplicationError::Configuration(_) | ApplicationError::Internal(_) => {
                "InternalServerError"
            }
        }
    }
}

/// Renders `{"errors":[{"type","message"}]}`. Server-side failures get a generic message
/// and a correlation id that is also written to the log with the full error.
impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        let body = match &self {
            ApplicationError::Unauthenticated(reason) => {
                warn!(reason = %reason, "Request rejected as unauthenticated");
                json!({ "errors": [{ "type": error_type, "message": NOT_AUTHORIZED }] })
            }
            ApplicationError::Forbidden => json!({
                "errors": [{ "type": error_type, "message": "You are not allowed to access this resource" }]
            }),
            ApplicationError::InvalidCredentials => {
                json!({ "errors": [{ "type": error_type, "message": INVALID_CREDENTIALS }] })
            }
            ApplicationError::Conflict(msg)
            | ApplicationError::NotFound(msg)
            | ApplicationError::Validation(msg) => {
                json!({ "errors": [{ "type": error_type, "message": msg }] })
            }
            ApplicationError::Configuration(_) | ApplicationError::Internal(_) => {
                let correlation_id = Uuid::new_v4();
                error!(%correlation_id, error = %self, "Request failed");
                internal_error_body(correlation_id)
            }
        };

        (status, Json(body)).into_response()
    }
}

pub(crate) fn internal_error_body(correlation_id: Uuid) -> serde_json::Value {
    json!({
        "errors": [{ "type": "InternalServerError", "message": "Internal server error" }],
        "correlation_id": correlation_id.to_string(),
    })
}
