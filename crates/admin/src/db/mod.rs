//! Database operations for admin.
//!
//! # Schema: `shop` (shared with the storefront)
//!
//! Admin owns every write to the catalog and merchandising tables, records
//! POS sales and manages the booking vertical.
//!
//! - `admin_user` - Back-office accounts and roles
//! - `category`, `product` - Catalog
//! - `coupon` - Discount codes
//! - `banner`, `home_block`, `combo_offer` - Merchandising
//! - `customer`, `subscription_category_discount` - Pricing terms
//! - `orders`, `order_item` - Online and POS orders
//! - `location`, `provider`, `slot`, `booking` - Service bookings
//! - `admin_session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations live in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod admin_users;
pub mod bookings;
pub mod catalog;
pub mod combos;
pub mod coupons;
pub mod customers;
pub mod merchandising;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use bookings::BookingRepository;
pub use catalog::CatalogRepository;
pub use combos::ComboRepository;
pub use coupons::CouponRepository;
pub use customers::CustomerRepository;
pub use merchandising::MerchandisingRepository;
pub use orders::OrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map unique and foreign key violations to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_constraint(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_non_constraint_errors_stay_database_errors() {
        let err = conflict_on_constraint(sqlx::Error::RowNotFound, "slug already exists");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
