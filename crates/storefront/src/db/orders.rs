//! Online orders.

use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::cart::CartError;
use bazaar_core::coupon::CouponError;
use bazaar_core::order::{NewOrder, Order, OrderItem};
use bazaar_core::order_store::{self, ORDER_COLUMNS, ORDER_ITEM_COLUMNS, PlacementError};
use bazaar_core::{CouponId, OrderId, UserId};

use super::RepositoryError;

/// Why an order could not be written.
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

/// Repository for storefront orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write an order in one transaction.
    ///
    /// Product rows are locked while stock is checked and decremented, and a
    /// redeemed coupon's use is counted only while it is under its limit.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::Cart` when stock is short (or a product has
    /// been withdrawn), `PlaceOrderError::Coupon` when the coupon ran out in
    /// the meantime, and `PlaceOrderError::Repository` for database failures.
    pub async fn place(
        &self,
        order: &NewOrder,
        coupon_id: Option<CouponId>,
    ) -> Result<OrderId, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;
        let stored = order_store::place(&mut tx, order, coupon_id).await?;
        tx.commit().await?;
        Ok(stored.id)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(&self, customer_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE customer_id = $1 ORDER BY placed_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Items of a customer's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for_orders(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM shop.order_item WHERE order_id = ANY($1) ORDER BY order_id, id"
        ))
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_errors_map_to_repository() {
        let err = PlaceOrderError::from(sqlx::Error::RowNotFound);
        assert!(matches!(
            err,
            PlaceOrderError::Repository(RepositoryError::Database(_))
        ));
    }

    #[test]
    fn test_stock_shortfall_message() {
        let shortfall = bazaar_core::cart::check_stock("Ghee 1L", 3, 1).unwrap_err();
        let err = PlaceOrderError::from(PlacementError::Cart(shortfall));
        assert_eq!(err.to_string(), "only 1 of Ghee 1L in stock (requested 3)");
    }
}
