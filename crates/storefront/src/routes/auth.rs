//! Authentication route handlers.
//!
//! Customers register and sign in with email and password. The signed-in
//! customer lives in the session; the cart survives login and logout.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::catalog::Customer;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_customer, set_current_customer};
use crate::models::CurrentCustomer;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl From<&Customer> for CurrentCustomer {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            email: customer.email.clone(),
            name: customer.name.clone(),
        }
    }
}

/// Create an account and sign in.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let customer = AuthService::new(state.pool())
        .register(
            &request.email,
            &request.name,
            request.phone.as_deref(),
            &request.password,
        )
        .await?;

    sign_in(&session, &customer).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// Sign in with email and password.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Customer>> {
    let customer = AuthService::new(state.pool())
        .login(&request.email, &request.password)
        .await?;

    sign_in(&session, &customer).await?;
    Ok(Json(customer))
}

/// Sign out. The cart is kept.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_customer(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

async fn sign_in(session: &Session, customer: &Customer) -> Result<()> {
    set_current_customer(session, &CurrentCustomer::from(customer)).await?;
    set_sentry_user(&customer.id, Some(customer.email.as_str()));
    tracing::info!(customer_id = %customer.id, "Customer signed in");
    Ok(())
}
