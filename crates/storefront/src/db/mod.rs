//! Database operations for the storefront.
//!
//! # Schema: `shop` (shared with admin)
//!
//! The storefront reads the catalog, merchandising, coupons and booking
//! tables, and writes customers, online orders and bookings.
//!
//! - `customer` - Storefront accounts and subscription terms
//! - `category`, `product` - Catalog
//! - `banner`, `home_block`, `combo_offer` - Merchandising
//! - `coupon` - Discount codes
//! - `orders`, `order_item` - Orders and their price snapshots
//! - `location`, `provider`, `slot`, `booking` - Service bookings
//! - `storefront_session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations live in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod bookings;
pub mod catalog;
pub mod customers;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use bookings::BookingRepository;
pub use catalog::CatalogRepository;
pub use customers::CustomerRepository;
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

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
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
