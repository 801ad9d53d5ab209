use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use core_lib::{
    CredentialHasher, RefreshTokenStore, TenantRepository, UserRepository,
    domain::user::Role,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

pub mod application;
pub mod config;

use application::{
    ApplicationError,
    authz::{AllowedRoles, role_guard},
    commands::{
        create_tenant::handle_create_tenant_request, current_user::handle_current_user_request,
        delete_user::handle_delete_user_request, login::handle_login_request,
        logout::handle_logout_request, refresh::handle_refresh_request,
        register_user::handle_register_user_request,
        update_user_role::handle_update_user_role_request,
    },
    internal_error_body,
    keys::KeyProvider,
    middleware::{authenticate, parse_refresh_token, validate_refresh_token},
    query::{handle_get_tenant, handle_jwks, handle_list_tenants, health, root},
    session::SessionOrchestrator,
    tokens::TokenIssuer,
    verifier::TokenVerifier,
};
use config::AuthConfig;

const ADMIN_ONLY: AllowedRoles = AllowedRoles(&[Role::Admin]);

// Holds shared dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthConfig>,
    pub keys: Arc<KeyProvider>,
    pub verifier: Arc<TokenVerifier>,
    pub session: Arc<SessionOrchestrator>,
    pub user_repo: Arc<dyn UserRepository>,
    pub tenant_repo: Arc<dyn TenantRepository>,
    pub refresh_token_store: Arc<dyn RefreshTokenStore>,
}

impl AppState {
    /// Wire the token subsystem over the given ports.
    pub fn new(
        config: AuthConfig,
        user_repo: Arc<dyn UserRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
        refresh_token_store: Arc<dyn RefreshTokenStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self, ApplicationError> {
        let keys = Arc::new(KeyProvider::from_config(&config)?);
        let issuer = Arc::new(TokenIssuer::new(
            keys.clone(),
            config.service_name.clone(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        ));
        let verifier = Arc::new(TokenVerifier::new(
            keys.clone(),
            refresh_token_store.clone(),
            &config.service_name,
            config.token_leeway_secs,
            config.store_timeout,
        ));
        let session = Arc::new(SessionOrchestrator::new(
            user_repo.clone(),
            refresh_token_store.clone(),
            hasher,
            issuer,
            config.store_timeout,
        ));

        Ok(Self {
            config: Arc::new(config),
            keys,
            verifier,
            session,
            user_repo,
            tenant_repo,
            refresh_token_store,
        })
    }
}

// Function to create the main Axum router with state
pub fn create_app(app_state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(handle_register_user_request))
        .route("/login", post(handle_login_request))
        .route(
            "/self",
            get(handle_current_user_request).route_layer(middleware::from_fn_with_state(
                app_state.clone(),
                authenticate,
            )),
        )
        .route(
            "/refresh",
            post(handle_refresh_request).route_layer(middleware::from_fn_with_state(
                app_state.clone(),
                validate_refresh_token,
            )),
        )
        .route(
            "/logout",
            // authenticate runs first (outermost), then the refresh cookie is parsed
            post(handle_logout_request)
                .route_layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    parse_refresh_token,
                ))
                .route_layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    authenticate,
                )),
        );

    let tenant_routes = Router::new()
        .route(
            "/",
            get(handle_list_tenants).merge(
                post(handle_create_tenant_request)
                    .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, role_guard))
                    .route_layer(middleware::from_fn_with_state(
                        app_state.clone(),
                        authenticate,
                    )),
            ),
        )
        .route(
            "/{tenant_id}",
            get(handle_get_tenant)
                .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, role_guard))
                .route_layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    authenticate,
                )),
        );

    // Every user route is admin only
    let user_routes = Router::new()
        .route(
            "/{user_id}",
            patch(handle_update_user_role_request).delete(handle_delete_user_request),
        )
        .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, role_guard))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            authenticate,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/.well-known/jwks.json", get(handle_jwks))
        .nest("/api/auth", auth_routes)
        .nest("/api/tenants", tenant_routes)
        .nest("/api/users", user_routes)
        .layer(cors_layer(app_state.config.whitelist_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(app_state)
}

/// Credentials are only allowed for an explicit origin.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors.allow_origin(origin).allow_credentials(true),
        Some(Err(e)) => {
            warn!(error = %e, "WHITELIST_ORIGIN is not a valid header value, CORS disabled");
            cors
        }
        None => cors,
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    let correlation_id = Uuid::new_v4();
    error!(%correlation_id, panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(internal_error_body(correlation_id)),
    )
        .into_response()
}
