//! Account route handlers (all require a signed-in customer).

use axum::{Json, extract::State};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use bazaar_core::catalog::Customer;
use bazaar_core::order::{Order, OrderItem};
use bazaar_core::pricing::CategoryDiscount;

use crate::db::bookings::BookingDetail;
use crate::db::{BookingRepository, CustomerRepository, OrderRepository};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Profile with the customer's pricing terms.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub customer: Customer,
    /// Whether subscription pricing applies right now.
    pub subscription_active: bool,
    pub category_discounts: Vec<CategoryDiscount>,
}

/// An order with its items.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Group items under their orders, keeping order sequence.
fn attach_items(orders: Vec<Order>, mut items: Vec<OrderItem>) -> Vec<OrderView> {
    orders
        .into_iter()
        .map(|order| {
            let (mine, rest): (Vec<_>, Vec<_>) =
                items.drain(..).partition(|item| item.order_id == order.id);
            items = rest;
            OrderView { order, items: mine }
        })
        .collect()
}

#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
) -> Result<Json<AccountView>> {
    let (customer, pricing) = CustomerRepository::new(state.pool())
        .pricing(customer.id)
        .await?;

    Ok(Json(AccountView {
        subscription_active: pricing.active_subscription(Utc::now()).is_some(),
        category_discounts: pricing.category_discounts,
        customer,
    }))
}

#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let repo = OrderRepository::new(state.pool());
    let orders = repo.list_for_customer(customer.id).await?;
    let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
    let items = repo.items_for_orders(&ids).await?;
    Ok(Json(attach_items(orders, items)))
}

#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn bookings(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
) -> Result<Json<Vec<BookingDetail>>> {
    let bookings = BookingRepository::new(state.pool())
        .list_for_customer(customer.id)
        .await?;
    Ok(Json(bookings))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{OrderChannel, OrderId, OrderItemId, OrderStatus, ProductId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    fn order(id: i32) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(id),
            channel: OrderChannel::Online,
            status: OrderStatus::Pending,
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            customer_gstin: None,
            customer_state_code: None,
            shipping_address: None,
            payment_type: None,
            coupon_code: None,
            subtotal: dec!(100),
            discount_total: Decimal::ZERO,
            taxable_total: dec!(95.24),
            gst_total: dec!(4.76),
            delivery_fee: Decimal::ZERO,
            round_off: Decimal::ZERO,
            total: dec!(100),
            created_by: None,
            placed_at: now,
            updated_at: now,
        }
    }

    fn item(id: i32, order_id: i32) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(id),
            order_id: OrderId::new(order_id),
            product_id: Some(ProductId::new(1)),
            combo_id: None,
            name: "Toor Dal 1kg".to_string(),
            hsn_code: Some("0713".to_string()),
            quantity: 1,
            list_price: dec!(100),
            unit_price: dec!(100),
            discount: Decimal::ZERO,
            gst_rate: dec!(5),
            line_total: dec!(100),
        }
    }

    #[test]
    fn test_items_grouped_by_order() {
        let views = attach_items(
            vec![order(2), order(1)],
            vec![item(1, 1), item(2, 2), item(3, 2)],
        );
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].order.id, OrderId::new(2));
        assert_eq!(views[0].items.len(), 2);
        assert_eq!(views[1].items.len(), 1);
    }

    #[test]
    fn test_order_view_is_flat() {
        let json = serde_json::to_value(OrderView {
            order: order(7),
            items: vec![item(1, 7)],
        })
        .unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["items"][0]["name"], "Toor Dal 1kg");
    }
}
