//! The order transaction shared by checkout and the point of sale.
//!
//! Placing an order takes product stock and a coupon use; cancelling gives
//! both back. Both servers run these statements inside a transaction they
//! own, so the two channels lock and count in exactly the same way.

use std::collections::BTreeMap;

use sqlx::PgConnection;
use thiserror::Error;

use crate::cart::{CartError, check_stock};
use crate::coupon::CouponError;
use crate::order::{NewOrder, Order};
use crate::types::{CouponId, OrderId, ProductId};

/// Columns of `shop.orders` in [`Order`] field order.
pub const ORDER_COLUMNS: &str = r"
    id, channel, status, customer_id, customer_name, customer_phone, customer_gstin,
    customer_state_code, shipping_address, payment_type, coupon_code, subtotal,
    discount_total, taxable_total, gst_total, delivery_fee, round_off, total,
    created_by, placed_at, updated_at
";

/// Columns of `shop.order_item` in `OrderItem` field order.
pub const ORDER_ITEM_COLUMNS: &str = r"
    id, order_id, product_id, combo_id, name, hsn_code, quantity, list_price,
    unit_price, discount, gst_rate, line_total
";

/// Counts a coupon use only while the coupon is under its limit.
const COUNT_COUPON_USE: &str = r"
    UPDATE shop.coupon
    SET used_count = used_count + 1
    WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)
";

/// Gives back the coupon use an order counted, never below zero.
const RELEASE_COUPON_USE: &str = r"
    UPDATE shop.coupon c
    SET used_count = GREATEST(c.used_count - 1, 0)
    FROM shop.orders o
    WHERE o.id = $1 AND o.coupon_code IS NOT NULL AND c.code = o.coupon_code
";

/// Returns an order's product units to stock.
const RESTOCK_ORDER: &str = r"
    UPDATE shop.product p
    SET stock = p.stock + i.quantity
    FROM (
        SELECT product_id, SUM(quantity)::INT AS quantity
        FROM shop.order_item
        WHERE order_id = $1 AND product_id IS NOT NULL
        GROUP BY product_id
    ) i
    WHERE p.id = i.product_id
";

/// Why an order could not be written.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Coupon(#[from] CouponError),
}

#[derive(sqlx::FromRow)]
struct StockRow {
    id: ProductId,
    name: String,
    stock: i32,
}

/// Units needed per product, summed over standalone and combo lines.
#[must_use]
pub fn stock_requirements(order: &NewOrder) -> BTreeMap<ProductId, (String, u32)> {
    let mut required = BTreeMap::new();
    for item in &order.items {
        let entry = required
            .entry(item.product_id)
            .or_insert_with(|| (item.name.clone(), 0u32));
        entry.1 = entry.1.saturating_add(item.quantity);
    }
    required
}

/// Write an order: lock, check and decrement stock, count the coupon use,
/// then insert the order and its items.
///
/// Products are locked in id order. A withdrawn product counts as out of
/// stock.
///
/// # Errors
///
/// Returns `PlacementError::Cart` when stock is short, `PlacementError::Coupon`
/// when the coupon reached its limit, and `PlacementError::Database` for
/// database failures.
pub async fn place(
    conn: &mut PgConnection,
    order: &NewOrder,
    coupon_id: Option<CouponId>,
) -> Result<Order, PlacementError> {
    reserve_stock(conn, order).await?;

    if let Some(coupon_id) = coupon_id {
        let counted = sqlx::query(COUNT_COUPON_USE)
            .bind(coupon_id)
            .execute(&mut *conn)
            .await?;
        if counted.rows_affected() == 0 {
            return Err(CouponError::UsageLimitReached.into());
        }
    }

    insert_order(conn, order).await
}

/// Give back what placing an order took: its product units and its coupon
/// use.
///
/// # Errors
///
/// Returns the database error if either update fails.
pub async fn release(conn: &mut PgConnection, order_id: OrderId) -> Result<(), sqlx::Error> {
    sqlx::query(RESTOCK_ORDER)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(RELEASE_COUPON_USE)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn reserve_stock(conn: &mut PgConnection, order: &NewOrder) -> Result<(), PlacementError> {
    let required = stock_requirements(order);
    let ids: Vec<ProductId> = required.keys().copied().collect();

    let rows = sqlx::query_as::<_, StockRow>(
        "SELECT id, name, stock FROM shop.product WHERE id = ANY($1) AND active ORDER BY id FOR UPDATE",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    for (product_id, (name, quantity)) in &required {
        match rows.iter().find(|row| row.id == *product_id) {
            Some(row) => check_stock(&row.name, *quantity, row.stock)?,
            None => check_stock(name, *quantity, 0)?,
        }
    }

    for (product_id, (_, quantity)) in &required {
        sqlx::query("UPDATE shop.product SET stock = stock - $2 WHERE id = $1")
            .bind(product_id)
            .bind(i32::try_from(*quantity).unwrap_or(i32::MAX))
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

async fn insert_order(conn: &mut PgConnection, order: &NewOrder) -> Result<Order, PlacementError> {
    let stored = sqlx::query_as::<_, Order>(&format!(
        r"
        INSERT INTO shop.orders (
            channel, status, customer_id, customer_name, customer_phone, customer_gstin,
            customer_state_code, shipping_address, payment_type, coupon_code, subtotal,
            discount_total, taxable_total, gst_total, delivery_fee, round_off, total, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order.channel)
    .bind(order.status)
    .bind(order.buyer.customer_id)
    .bind(order.buyer.name.as_deref())
    .bind(order.buyer.phone.as_deref())
    .bind(order.buyer.gstin.as_ref().map(|g| g.as_str().to_owned()))
    .bind(order.buyer.state_code.as_deref())
    .bind(order.buyer.shipping_address.as_deref())
    .bind(order.payment_type)
    .bind(order.coupon_code.as_deref())
    .bind(order.subtotal)
    .bind(order.discount_total)
    .bind(order.taxable_total)
    .bind(order.gst_total)
    .bind(order.delivery_fee)
    .bind(order.round_off)
    .bind(order.total)
    .bind(order.created_by)
    .fetch_one(&mut *conn)
    .await?;

    for item in &order.items {
        sqlx::query(
            r"
            INSERT INTO shop.order_item (
                order_id, product_id, combo_id, name, hsn_code, quantity, list_price,
                unit_price, discount, gst_rate, line_total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(stored.id)
        .bind(item.product_id)
        .bind(item.combo_id)
        .bind(&item.name)
        .bind(item.hsn_code.as_deref())
        .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
        .bind(item.list_price)
        .bind(item.unit_price)
        .bind(item.discount)
        .bind(item.gst_rate)
        .bind(item.line_total)
        .execute(&mut *conn)
        .await?;
    }

    Ok(stored)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::order::{BuyerDetails, NewOrderItem};
    use crate::types::{ComboId, OrderChannel, OrderStatus};

    fn item(product: i32, combo: Option<i32>, quantity: u32) -> NewOrderItem {
        NewOrderItem {
            product_id: ProductId::new(product),
            combo_id: combo.map(ComboId::new),
            name: format!("Product {product}"),
            hsn_code: None,
            quantity,
            list_price: dec!(100),
            unit_price: dec!(100),
            discount: Decimal::ZERO,
            gst_rate: dec!(5),
            line_total: dec!(100),
        }
    }

    fn order(items: Vec<NewOrderItem>) -> NewOrder {
        NewOrder {
            channel: OrderChannel::Pos,
            status: OrderStatus::Completed,
            buyer: BuyerDetails::default(),
            payment_type: None,
            coupon_code: Some("DAL10".to_string()),
            subtotal: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            taxable_total: Decimal::ZERO,
            gst_total: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            round_off: Decimal::ZERO,
            total: Decimal::ZERO,
            created_by: None,
            items,
        }
    }

    #[test]
    fn test_requirements_sum_standalone_and_combo_units() {
        let required = stock_requirements(&order(vec![
            item(7, None, 2),
            item(3, None, 1),
            item(7, Some(1), 3),
        ]));
        let ids: Vec<ProductId> = required.keys().copied().collect();
        assert_eq!(ids, vec![ProductId::new(3), ProductId::new(7)]);
        assert_eq!(required.get(&ProductId::new(7)).unwrap().1, 5);
    }

    #[test]
    fn test_coupon_release_is_floored_and_keyed_on_order_code() {
        assert!(RELEASE_COUPON_USE.contains("GREATEST(c.used_count - 1, 0)"));
        assert!(RELEASE_COUPON_USE.contains("c.code = o.coupon_code"));
        assert!(RELEASE_COUPON_USE.contains("o.id = $1"));
        assert!(COUNT_COUPON_USE.contains("used_count < usage_limit"));
    }

    #[test]
    fn test_restock_skips_deleted_products() {
        assert!(RESTOCK_ORDER.contains("product_id IS NOT NULL"));
        assert!(RESTOCK_ORDER.contains("stock = p.stock + i.quantity"));
    }

    #[test]
    fn test_column_lists_match_records() {
        assert_eq!(ORDER_COLUMNS.split(',').count(), 21);
        assert_eq!(ORDER_ITEM_COLUMNS.split(',').count(), 12);
    }
}
