//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server errors are captured
//! to Sentry; every error is rendered as `{"error": "<message>"}` with
//! internal details replaced by a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use bazaar_core::booking::BookingError;
use bazaar_core::cart::CartError;
use bazaar_core::combo::ComboError;
use bazaar_core::coupon::CouponError;

use crate::db::RepositoryError;
use crate::db::bookings::BookingAdminError;
use crate::db::catalog::CatalogInputError;
use crate::db::customers::PricingInputError;
use crate::db::merchandising::MerchandisingInputError;
use crate::db::orders::{PlaceOrderError, StatusChangeError};
use crate::services::auth::AdminAuthError;
use crate::services::pos::PosError;

/// Application-level error type for admin.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AdminAuthError),

    /// Basket could not be totalled or stock ran out.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Coupon definition rejected or coupon cannot be redeemed.
    #[error("Coupon error: {0}")]
    Coupon(#[from] CouponError),

    /// Combo definition rejected.
    #[error("Combo error: {0}")]
    Combo(#[from] ComboError),

    /// Location, provider or booking change rejected.
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Invoice template failed to render.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CatalogInputError> for AppError {
    fn from(err: CatalogInputError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<MerchandisingInputError> for AppError {
    fn from(err: MerchandisingInputError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<PricingInputError> for AppError {
    fn from(err: PricingInputError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<PlaceOrderError> for AppError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::Repository(e) => Self::Database(e),
            PlaceOrderError::Cart(e) => Self::Cart(e),
            PlaceOrderError::Coupon(e) => Self::Coupon(e),
        }
    }
}

impl From<StatusChangeError> for AppError {
    fn from(err: StatusChangeError) -> Self {
        match err {
            StatusChangeError::Repository(e) => Self::Database(e),
            StatusChangeError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl From<BookingAdminError> for AppError {
    fn from(err: BookingAdminError) -> Self {
        match err {
            BookingAdminError::Repository(e) => Self::Database(e),
            BookingAdminError::Booking(e) => Self::Booking(e),
            BookingAdminError::NotALocality(_) | BookingAdminError::InvalidCapacity => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

impl From<PosError> for AppError {
    fn from(err: PosError) -> Self {
        match err {
            PosError::Repository(e) => Self::Database(e),
            PosError::Cart(e) => Self::Cart(e),
            PosError::Coupon(e) => Self::Coupon(e),
            PosError::PlaceOrder(e) => e.into(),
            PosError::UnknownCoupon(_) => Self::NotFound(err.to_string()),
            PosError::UnknownProduct(_) | PosError::UnknownCombo(_) => {
                Self::Conflict(err.to_string())
            }
            PosError::InvalidGstin(_) => Self::BadRequest(err.to_string()),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AdminAuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AdminAuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AdminAuthError::WeakPassword(_) | AdminAuthError::InvalidEmail(_) => {
                    StatusCode::BAD_REQUEST
                }
                AdminAuthError::Repository(_) | AdminAuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(CartError::InsufficientStock { .. }) => StatusCode::CONFLICT,
            Self::Cart(_) | Self::Combo(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Coupon(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Booking(BookingError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            Self::Booking(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Message shown to the client. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Auth(err) => match err {
                AdminAuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AdminAuthError::UserAlreadyExists => {
                    "An admin with this email already exists".to_string()
                }
                AdminAuthError::WeakPassword(msg) => msg.clone(),
                AdminAuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AdminAuthError::Repository(_) | AdminAuthError::PasswordHash => {
                    "Authentication error".to_string()
                }
            },
            Self::Cart(e) => e.to_string(),
            Self::Coupon(e) => e.to_string(),
            Self::Combo(e) => e.to_string(),
            Self::Booking(e) => e.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with a signed-in admin.
pub fn set_sentry_user(admin_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
