use core_lib::UserRepository;
use core_lib::domain::user::{Role, User};
use tracing::{error, info};

use super::ApplicationError;
use super::session::{Registration, SessionOrchestrator};
use crate::config::AdminSeed;

/// Create the default admin when no admin exists yet. Returns the created user, if any.
pub async fn ensure_default_admin(
    users: &dyn UserRepository,
    session: &SessionOrchestrator,
    seed: &AdminSeed,
) -> Result<Option<User>, ApplicationError> {
    if users.exists_with_role(Role::Admin).await? {
        info!("Admin user already exists, skipping bootstrap");
        return Ok(None);
    }

    let admin = session
        .create_user(Registration {
            first_name: seed.first_name.clone(),
            last_name: seed.last_name.clone(),
            email: seed.email.clone(),
            password: seed.password.clone(),
            role: Role::Admin,
            tenant_id: None,
        })
        .await?;
    info!(user_id = %admin.id, "Default admin user created");
    Ok(Some(admin))
}

/// Start-up wrapper: failures are logged, never fatal.
pub async fn run(users: &dyn UserRepository, session: &SessionOrchestrator, seed: Option<&AdminSeed>) {
    let Some(seed) = seed else {
        info!("ADMIN_DEFAULT_* not set, skipping admin bootstrap");
        return;
    };
    if let Err(e) = ensure_default_admin(users, session, seed).await {
        error!(error = %e, "Failed to create default admin user");
    }
}
