#![allow(dead_code)]

use auth_service::{
    AppState, application::session::Registration, config::AuthConfig, create_app,
};
use axum_test::{TestResponse, TestServer};
use core_lib::{
    RefreshTokenStore,
    adapters::{
        argon2_hasher::Argon2Hasher, in_memory_refresh_token_store::InMemoryRefreshTokenStore,
        in_memory_tenant_repository::InMemoryTenantRepository,
        in_memory_user_repository::InMemoryUserRepository,
    },
    domain::user::{Role, User},
};
use http::{HeaderName, HeaderValue, header};
use std::collections::HashMap;
use std::sync::Arc;

pub const TEST_KEY: &str = include_str!("../fixtures/private_key.pem");
pub const REFRESH_SECRET: &str = "test-refresh-secret-0123456789abcdef";
pub const PASSWORD: &str = "longenough1";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub users: Arc<InMemoryUserRepository>,
    pub tenants: Arc<InMemoryTenantRepository>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
}

pub fn test_config() -> AuthConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("SERVICE_NAME", "auth-service"),
        ("PRIVATE_KEY", TEST_KEY),
        ("SIGNING_KEY_ID", "test-kid"),
        ("REFRESH_TOKEN_SECRET", REFRESH_SECRET),
        ("TOKEN_LEEWAY_SECS", "0"),
        ("STORE_TIMEOUT_MS", "200"),
    ]);
    AuthConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("test config is valid")
}

// Helper function to set up the test application with in-memory dependencies
pub fn setup_test_app() -> TestApp {
    let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
    let (server, state, users, tenants) = build(refresh_tokens.clone());
    TestApp {
        server,
        state,
        users,
        tenants,
        refresh_tokens,
    }
}

/// Same wiring, but with a caller-supplied refresh token store.
pub fn setup_test_app_with_store(
    store: Arc<dyn RefreshTokenStore>,
) -> (TestServer, AppState, Arc<InMemoryUserRepository>) {
    let (server, state, users, _) = build(store);
    (server, state, users)
}

fn build(
    store: Arc<dyn RefreshTokenStore>,
) -> (
    TestServer,
    AppState,
    Arc<InMemoryUserRepository>,
    Arc<InMemoryTenantRepository>,
) {
    let users = Arc::new(InMemoryUserRepository::new());
    let tenants = Arc::new(InMemoryTenantRepository::new());
    let hasher = Arc::new(Argon2Hasher::with_cost(1024, 1, 1).expect("valid argon2 params"));

    let state = AppState::new(test_config(), users.clone(), tenants.clone(), store, hasher)
        .expect("Failed to build AppState");
    let server = TestServer::new(create_app(state.clone())).expect("Failed to create TestServer");
    (server, state, users, tenants)
}

/// A user with the given role and a live session, created without going through HTTP.
pub async fn user_with_session(app: &TestApp, email: &str, role: Role) -> (User, String, String) {
    let user = app
        .state
        .session
        .create_user(Registration {
            first_name: "Test".into(),
            last_name: "User".into(),
            email: email.into(),
            password: PASSWORD.into(),
            role,
            tenant_id: None,
        })
        .await
        .expect("create user");
    let tokens = app
        .state
        .session
        .issue_session_for(&user)
        .await
        .expect("issue session");
    (user, tokens.access_token, tokens.refresh_token)
}

/// Value of a cookie set by the response, if any.
pub fn set_cookie_value(response: &TestResponse, name: &str) -> Option<String> {
    set_cookie_header(response, name).and_then(|cookie| {
        cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value.to_string())
    })
}

/// Full `Set-Cookie` header for `name`, attributes included.
pub fn set_cookie_header(response: &TestResponse, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|cookie| cookie.starts_with(&prefix))
        .map(str::to_string)
}

pub fn cookie_header(pairs: &[(&str, &str)]) -> (HeaderName, HeaderValue) {
    let value = pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    (
        header::COOKIE,
        HeaderValue::from_str(&value).expect("valid cookie header"),
    )
}

pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("valid auth header"),
    )
}

/// Three dot-separated base64url segments.
pub fn looks_like_jwt(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}
