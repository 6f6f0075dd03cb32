//! Order records and the snapshot written when an order is placed.
//!
//! Order items copy the name, HSN code, prices, discount share and GST rate
//! at the time of purchase. Invoices are rebuilt from these rows, so later
//! catalog edits never change a past bill.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{CartTotals, PricedLine};
use crate::invoice::{InvoiceItem, InvoiceSource, Party};
use crate::types::{
    AdminUserId, ComboId, Gstin, OrderChannel, OrderId, OrderItemId, OrderStatus, PaymentType,
    ProductId, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Order {
    pub id: OrderId,
    pub channel: OrderChannel,
    pub status: OrderStatus,
    pub customer_id: Option<UserId>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_gstin: Option<String>,
    pub customer_state_code: Option<String>,
    pub shipping_address: Option<String>,
    pub payment_type: Option<PaymentType>,
    pub coupon_code: Option<String>,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub taxable_total: Decimal,
    pub gst_total: Decimal,
    pub delivery_fee: Decimal,
    pub round_off: Decimal,
    pub total: Decimal,
    pub created_by: Option<AdminUserId>,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub combo_id: Option<ComboId>,
    pub name: String,
    pub hsn_code: Option<String>,
    pub quantity: i32,
    pub list_price: Decimal,
    pub unit_price: Decimal,
    /// This line's share of the order's coupon and manual discounts.
    pub discount: Decimal,
    pub gst_rate: Decimal,
    /// Net amount paid for the line, GST included.
    pub line_total: Decimal,
}

/// An order item before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub combo_id: Option<ComboId>,
    pub name: String,
    pub hsn_code: Option<String>,
    pub quantity: u32,
    pub list_price: Decimal,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub gst_rate: Decimal,
    pub line_total: Decimal,
}

impl From<&PricedLine> for NewOrderItem {
    fn from(priced: &PricedLine) -> Self {
        Self {
            product_id: priced.line.product_id,
            combo_id: priced.line.combo_id,
            name: priced.line.name.clone(),
            hsn_code: priced.line.hsn_code.clone(),
            quantity: priced.line.quantity,
            list_price: priced.line.list_price,
            unit_price: priced.line.unit_price,
            discount: priced.discount,
            gst_rate: priced.line.gst_rate,
            line_total: priced.net,
        }
    }
}

/// Who is buying, as recorded on the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerDetails {
    pub customer_id: Option<UserId>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gstin: Option<Gstin>,
    pub state_code: Option<String>,
    pub shipping_address: Option<String>,
}

/// Everything needed to insert an order and its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub channel: OrderChannel,
    pub status: OrderStatus,
    pub buyer: BuyerDetails,
    pub payment_type: Option<PaymentType>,
    pub coupon_code: Option<String>,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub taxable_total: Decimal,
    pub gst_total: Decimal,
    pub delivery_fee: Decimal,
    pub round_off: Decimal,
    pub total: Decimal,
    pub created_by: Option<AdminUserId>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Snapshot a totalled cart.
    ///
    /// Online orders start as `pending`; POS sales are `completed` at the
    /// counter.
    #[must_use]
    pub fn from_totals(
        channel: OrderChannel,
        totals: &CartTotals,
        buyer: BuyerDetails,
        payment_type: Option<PaymentType>,
        coupon_code: Option<String>,
    ) -> Self {
        let status = match channel {
            OrderChannel::Online => OrderStatus::Pending,
            OrderChannel::Pos => OrderStatus::Completed,
        };
        Self {
            channel,
            status,
            buyer,
            payment_type,
            coupon_code,
            subtotal: totals.subtotal,
            discount_total: totals.total_discount,
            taxable_total: totals.taxable_total,
            gst_total: totals.gst_total,
            delivery_fee: totals.delivery_fee,
            round_off: totals.round_off,
            total: totals.payable,
            created_by: None,
            items: totals.lines.iter().map(NewOrderItem::from).collect(),
        }
    }
}

impl Order {
    /// The buyer block of the invoice.
    #[must_use]
    pub fn buyer_party(&self) -> Party {
        Party {
            name: self
                .customer_name
                .clone()
                .unwrap_or_else(|| "Walk-in Customer".to_owned()),
            address: self.shipping_address.clone(),
            phone: self.customer_phone.clone(),
            email: None,
            gstin: self.customer_gstin.as_deref().and_then(|g| Gstin::parse(g).ok()),
            state_code: self.customer_state_code.clone(),
        }
    }

    /// Invoice input from this order and its stored items.
    #[must_use]
    pub fn invoice_source(&self, items: &[OrderItem], seller: Party) -> InvoiceSource {
        InvoiceSource {
            order_id: self.id,
            placed_at: self.placed_at,
            channel: self.channel,
            payment_type: self.payment_type,
            seller,
            buyer: self.buyer_party(),
            items: items
                .iter()
                .map(|item| InvoiceItem {
                    name: item.name.clone(),
                    hsn_code: item.hsn_code.clone(),
                    quantity: u32::try_from(item.quantity).unwrap_or_default(),
                    unit_price: item.unit_price,
                    gst_rate: item.gst_rate,
                    discount: item.discount,
                })
                .collect(),
            delivery_fee: self.delivery_fee,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::cart::{Adjustments, CartLine};
    use crate::invoice::{Invoice, SupplyType};

    fn totals() -> CartTotals {
        CartTotals::compute(
            vec![
                CartLine {
                    product_id: ProductId::new(1),
                    combo_id: None,
                    name: "Basmati Rice 5kg".to_string(),
                    hsn_code: Some("1006".to_string()),
                    list_price: dec!(650),
                    unit_price: dec!(600),
                    quantity: 1,
                    gst_rate: dec!(5),
                },
                CartLine {
                    product_id: ProductId::new(2),
                    combo_id: None,
                    name: "Steel Tiffin".to_string(),
                    hsn_code: Some("7323".to_string()),
                    list_price: dec!(200),
                    unit_price: dec!(200),
                    quantity: 2,
                    gst_rate: dec!(18),
                },
            ],
            &Adjustments {
                coupon_discount: dec!(100),
                coupon_scope: None,
                manual_discount: None,
                delivery_fee: dec!(40),
            },
        )
        .unwrap()
    }

    fn stored(new: &NewOrder) -> (Order, Vec<OrderItem>) {
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(42),
            channel: new.channel,
            status: new.status,
            customer_id: new.buyer.customer_id,
            customer_name: new.buyer.name.clone(),
            customer_phone: new.buyer.phone.clone(),
            customer_gstin: new.buyer.gstin.as_ref().map(|g| g.as_str().to_owned()),
            customer_state_code: new.buyer.state_code.clone(),
            shipping_address: new.buyer.shipping_address.clone(),
            payment_type: new.payment_type,
            coupon_code: new.coupon_code.clone(),
            subtotal: new.subtotal,
            discount_total: new.discount_total,
            taxable_total: new.taxable_total,
            gst_total: new.gst_total,
            delivery_fee: new.delivery_fee,
            round_off: new.round_off,
            total: new.total,
            created_by: None,
            placed_at: now,
            updated_at: now,
        };
        let items = new
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| OrderItem {
                id: OrderItemId::new(i32::try_from(i).unwrap() + 1),
                order_id: order.id,
                product_id: Some(item.product_id),
                combo_id: item.combo_id,
                name: item.name.clone(),
                hsn_code: item.hsn_code.clone(),
                quantity: i32::try_from(item.quantity).unwrap(),
                list_price: item.list_price,
                unit_price: item.unit_price,
                discount: item.discount,
                gst_rate: item.gst_rate,
                line_total: item.line_total,
            })
            .collect();
        (order, items)
    }

    #[test]
    fn test_snapshot_carries_discount_shares() {
        let new = NewOrder::from_totals(
            OrderChannel::Online,
            &totals(),
            BuyerDetails::default(),
            Some(PaymentType::Online),
            Some("DIWALI100".to_string()),
        );
        assert_eq!(new.status, OrderStatus::Pending);
        assert_eq!(new.subtotal, dec!(1000));
        assert_eq!(new.discount_total, dec!(100));
        assert_eq!(new.total, dec!(940));
        let shares: Decimal = new.items.iter().map(|i| i.discount).sum();
        assert_eq!(shares, dec!(100));
        let paid: Decimal = new.items.iter().map(|i| i.line_total).sum();
        assert_eq!(paid, dec!(900));
    }

    #[test]
    fn test_pos_sale_is_completed() {
        let new = NewOrder::from_totals(
            OrderChannel::Pos,
            &totals(),
            BuyerDetails::default(),
            Some(PaymentType::Cash),
            None,
        );
        assert_eq!(new.status, OrderStatus::Completed);
    }

    #[test]
    fn test_invoice_matches_order_totals() {
        let buyer = BuyerDetails {
            name: Some("Kiran Traders".to_string()),
            gstin: Some(Gstin::parse("29AAGCB7383J1Z4").unwrap()),
            ..BuyerDetails::default()
        };
        let new = NewOrder::from_totals(OrderChannel::Pos, &totals(), buyer, None, None);
        let (order, items) = stored(&new);
        let seller = Party {
            name: "Bazaar Stores".to_string(),
            state_code: Some("27".to_string()),
            ..Party::default()
        };

        let invoice = Invoice::build(order.invoice_source(&items, seller));
        assert_eq!(invoice.supply_type, SupplyType::InterState);
        assert_eq!(invoice.discount_total, order.discount_total);
        assert_eq!(invoice.taxable_total, order.taxable_total);
        assert_eq!(invoice.tax_total, order.gst_total);
        assert_eq!(invoice.payable, order.total);
    }

    #[test]
    fn test_walk_in_buyer() {
        let new = NewOrder::from_totals(
            OrderChannel::Pos,
            &totals(),
            BuyerDetails::default(),
            None,
            None,
        );
        let (order, _) = stored(&new);
        assert_eq!(order.buyer_party().name, "Walk-in Customer");
        assert!(order.buyer_party().gstin.is_none());
    }
}
