//! Back-office sign in and sign out.
//!
//! Admins sign in with email and password; the signed-in admin lives in the
//! session. Failed attempts are throttled by the login rate limiter.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_admin, set_current_admin};
use crate::models::{AdminUser, CurrentAdmin};
use crate::services::AdminAuthService;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Sign in with email and password.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AdminUser>> {
    let admin = AdminAuthService::new(state.pool())
        .login(&request.email, &request.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Admin login failed"))?;

    set_current_admin(&session, &CurrentAdmin::from(&admin)).await?;
    set_sentry_user(&admin.id, Some(admin.email.as_str()));
    tracing::info!(admin_id = %admin.id, role = %admin.role, "Admin signed in");

    Ok(Json(admin))
}

/// Sign out and drop the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
