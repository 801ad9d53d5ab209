use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::application::ApplicationError;

/// Verifies the access token (bearer, then cookie) and inserts the `Identity` extension.
pub async fn authenticate(
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApplicationError> {
    let identity = app_state.verifier.verify_access(req.headers())?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Verifies the refresh cookie including the store lookup and inserts `RefreshIdentity`.
pub async fn validate_refresh_token(
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApplicationError> {
    let refresh = app_state.verifier.verify_refresh(req.headers()).await?;
    req.extensions_mut().insert(refresh);
    Ok(next.run(req).await)
}

/// Signature-only variant of [`validate_refresh_token`].
pub async fn parse_refresh_token(
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApplicationError> {
    let refresh = app_state.verifier.parse_refresh(req.headers())?;
    req.extensions_mut().insert(refresh);
    Ok(next.run(req).await)
}
