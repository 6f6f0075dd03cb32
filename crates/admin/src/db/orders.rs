//! Order management and POS sales.

use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::cart::CartError;
use bazaar_core::coupon::CouponError;
use bazaar_core::order::{NewOrder, Order, OrderItem};
use bazaar_core::order_store::{self, ORDER_COLUMNS, ORDER_ITEM_COLUMNS, PlacementError};
use bazaar_core::{CouponId, OrderChannel, OrderId, OrderStatus};

use super::RepositoryError;

/// Why a POS sale could not be written.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Coupon(#[from] CouponError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

impl From<PlacementError> for PlaceOrderError {
    fn from(e: PlacementError) -> Self {
        match e {
            PlacementError::Database(e) => e.into(),
            PlacementError::Cart(e) => Self::Cart(e),
            PlacementError::Coupon(e) => Self::Coupon(e),
        }
    }
}

/// Why an order's status could not be changed.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

impl From<sqlx::Error> for StatusChangeError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Filters for the order list.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub channel: Option<OrderChannel>,
}

/// Repository for orders across both channels.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a POS sale in one transaction.
    ///
    /// Stock is locked, checked and decremented; a redeemed coupon's use is
    /// counted only while it is under its limit.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::Cart` when stock is short, `PlaceOrderError::Coupon`
    /// when the coupon ran out, and `PlaceOrderError::Repository` for database failures.
    pub async fn place(
        &self,
        order: &NewOrder,
        coupon_id: Option<CouponId>,
    ) -> Result<Order, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;
        let order = order_store::place(&mut tx, order, coupon_id).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: OrderFilter, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM shop.orders
            WHERE ($1::shop.order_status IS NULL OR status = $1)
              AND ($2::shop.order_channel IS NULL OR channel = $2)
            ORDER BY placed_at DESC
            LIMIT $3
            "
        ))
        .bind(filter.status)
        .bind(filter.channel)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM shop.order_item WHERE order_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Move an order along its lifecycle.
    ///
    /// Cancelling returns the order's units to stock and gives back the use
    /// its coupon counted.
    ///
    /// # Errors
    ///
    /// Returns `StatusChangeError::InvalidTransition` for a move the lifecycle
    /// does not allow and `RepositoryError::NotFound` for an unknown order.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, StatusChangeError> {
        let mut tx = self.pool.begin().await?;

        let current: OrderStatus =
            sqlx::query_scalar("SELECT status FROM shop.orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(StatusChangeError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        if next.releases_reservations() {
            order_store::release(&mut tx, id).await?;
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE shop.orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_errors_map_to_repository() {
        let err = StatusChangeError::from(sqlx::Error::RowNotFound);
        assert!(matches!(
            err,
            StatusChangeError::Repository(RepositoryError::Database(_))
        ));
    }

    #[test]
    fn test_transition_message() {
        let err = StatusChangeError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "cannot move an order from delivered to cancelled");
    }

    #[test]
    fn test_placement_errors_keep_their_kind() {
        let err = PlaceOrderError::from(PlacementError::Database(sqlx::Error::RowNotFound));
        assert!(matches!(
            err,
            PlaceOrderError::Repository(RepositoryError::Database(_))
        ));
        let err = PlaceOrderError::from(PlacementError::Coupon(CouponError::UsageLimitReached));
        assert!(matches!(err, PlaceOrderError::Coupon(CouponError::UsageLimitReached)));
    }

    #[test]
    fn test_cancelling_releases_reservations() {
        assert!(OrderStatus::Cancelled.releases_reservations());
        assert!(!OrderStatus::Delivered.releases_reservations());
        assert!(OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_coupon_exhaustion_passes_through() {
        let err = PlaceOrderError::from(CouponError::UsageLimitReached);
        assert_eq!(err.to_string(), "coupon usage limit reached");
    }
}
