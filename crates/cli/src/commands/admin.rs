//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! BAZAAR_ADMIN_PASSWORD='long counter passphrase' \
//!     bz-cli admin create -e owner@example.in -n "Store Owner" -r super_admin
//! ```
//!
//! The password is read from an environment variable so it never appears in
//! shell history or process listings.
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use thiserror::Error;

use bazaar_admin::db;
use bazaar_admin::services::{AdminAuthError, AdminAuthService};
use bazaar_core::{AdminRole, AdminUserId};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, cashier")]
    InvalidRole(String),

    /// Account could not be created.
    #[error(transparent)]
    Auth(#[from] AdminAuthError),
}

fn parse_role(role: &str) -> Result<AdminRole, AdminError> {
    role.trim()
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))
}

/// Create a new admin user.
///
/// # Errors
///
/// Returns `AdminError` for a bad role, a missing password or database URL,
/// or when the account cannot be created.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password_env: &str,
) -> Result<AdminUserId, AdminError> {
    let role = parse_role(role)?;
    let database_url = super::database_url()
        .ok_or_else(|| AdminError::MissingEnvVar("ADMIN_DATABASE_URL".to_owned()))?;
    let password = std::env::var(password_env)
        .map_err(|_| AdminError::MissingEnvVar(password_env.to_owned()))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    let admin = AdminAuthService::new(&pool)
        .create_admin(email, name, role, &password)
        .await?;

    tracing::info!(admin_id = %admin.id, email = %admin.email, role = %admin.role, "Admin user created");
    Ok(admin.id)
}
