use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use core_lib::domain::user::Role;
use tracing::warn;

use super::ApplicationError;
use super::tokens::Identity;

/// Per-route allow-list for [`role_guard`].
#[derive(Debug, Clone, Copy)]
pub struct AllowedRoles(pub &'static [Role]);

/// Uses only the role captured in the verified token; no user lookup.
pub fn require_role(identity: &Identity, allowed: &[Role]) -> Result<(), ApplicationError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(ApplicationError::Forbidden)
    }
}

/// Must run after `authenticate`, which puts the [`Identity`] in the request extensions.
pub async fn role_guard(
    State(AllowedRoles(allowed)): State<AllowedRoles>,
    req: Request,
    next: Next,
) -> Result<Response, ApplicationError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .copied()
        .ok_or_else(|| ApplicationError::Unauthenticated("no verified identity".into()))?;

    if let Err(e) = require_role(&identity, allowed) {
        warn!(user_id = %identity.user_id, role = %identity.role, "Role not permitted for route");
        return Err(e);
    }
    Ok(next.run(req).await)
}
