use auth_service::{AppState, application::bootstrap, config::AuthConfig, create_app};
use core_lib::{
    CredentialHasher, RefreshTokenStore, TenantRepository, UserRepository,
    adapters::{
        argon2_hasher::Argon2Hasher, in_memory_refresh_token_store::InMemoryRefreshTokenStore,
        in_memory_tenant_repository::InMemoryTenantRepository,
        in_memory_user_repository::InMemoryUserRepository,
        postgres_refresh_token_store::PostgresRefreshTokenStore,
        postgres_tenant_repository::PostgresTenantRepository,
        postgres_user_repository::PostgresUserRepository,
    },
};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

type Stores = (
    Arc<dyn UserRepository>,
    Arc<dyn TenantRepository>,
    Arc<dyn RefreshTokenStore>,
);

// --- Migration Runner ---
async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Applying database migrations...");
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new("./migrations")).await?;
    migrator.run(pool).await?;
    info!("Migrations applied successfully.");
    Ok(())
}

/// Postgres adapters when DATABASE_URL is set, in-memory otherwise.
async fn build_stores(
    database_url: Option<&str>,
) -> Result<Stores, Box<dyn std::error::Error + Send + Sync>> {
    let Some(url) = database_url else {
        warn!("DATABASE_URL not set, using in-memory stores (data is lost on restart)");
        let stores: Stores = (
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryTenantRepository::new()),
            Arc::new(InMemoryRefreshTokenStore::new()),
        );
        return Ok(stores);
    };

    let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
    info!("Connected to Postgres");
    run_migrations(&pool).await?;

    let stores: Stores = (
        Arc::new(PostgresUserRepository::new(pool.clone())),
        Arc::new(PostgresTenantRepository::new(pool.clone())),
        Arc::new(PostgresRefreshTokenStore::new(pool)),
    );
    Ok(stores)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() {
    // Load environment (.env) if present
    dotenv().ok();

    // RUST_LOG wins; INFO otherwise
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting auth service v{}...", env!("CARGO_PKG_VERSION"));

    let config = match AuthConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let (user_repo, tenant_repo, refresh_store) =
        match build_stores(config.database_url.as_deref()).await {
            Ok(stores) => stores,
            Err(e) => {
                error!("Failed to initialise persistence: {}", e);
                std::process::exit(1);
            }
        };
    let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new());

    let admin_seed = config.admin_seed.clone();
    let addr = config.bind_addr;

    let app_state = match AppState::new(config, user_repo, tenant_repo, refresh_store, hasher) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to load signing keys: {}", e);
            std::process::exit(1);
        }
    };

    bootstrap::run(
        app_state.user_repo.as_ref(),
        &app_state.session,
        admin_seed.as_ref(),
    )
    .await;

    let app = create_app(app_state);

    info!("Auth service listening on {}", addr);
    let listener = TcpListener::bind(addr).await.unwrap_or_else(|e| {
        panic!("Failed to bind to address {}: {}", addr, e);
    });

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            panic!("Server failed to run: {}", e);
        });
}
