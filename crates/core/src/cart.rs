//! Cart totals for online checkout and the point of sale.
//!
//! Product prices are GST-inclusive. A cart is totalled by:
//!
//! 1. Summing each line's gross (`unit_price * quantity`).
//! 2. Taking the coupon discount, then any manual POS discount, off the
//!    subtotal (never more than the subtotal).
//! 3. Spreading each discount across lines in proportion to their gross. A
//!    coupon bound to one product only lands on that product's standalone
//!    lines; the manual discount spreads over what the coupon left.
//! 4. Splitting each line's net into taxable value and GST at its own rate.
//! 5. Adding the (untaxed) delivery fee and rounding the payable amount to the
//!    nearest rupee.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::CustomerPricing;
use crate::types::{
    ComboId, OrderChannel, ProductId, allocate_proportionally, percent_of, round_money,
};

/// Errors raised while totalling a cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("cart is empty")]
    Empty,
    #[error("quantity for {name} must be at least 1")]
    InvalidQuantity { name: String },
    #[error("GST rate {rate} for {name} is not a valid slab")]
    InvalidGstRate { name: String, rate: Decimal },
    #[error("only {available} of {name} in stock (requested {requested})")]
    InsufficientStock {
        name: String,
        requested: u32,
        available: i32,
    },
    #[error("manual discount must not be negative")]
    NegativeDiscount,
}

/// GST slabs accepted on products, in percent.
pub const GST_SLABS: [Decimal; 5] = [
    Decimal::ZERO,
    Decimal::from_parts(5, 0, 0, false, 0),
    Decimal::from_parts(12, 0, 0, false, 0),
    Decimal::from_parts(18, 0, 0, false, 0),
    Decimal::from_parts(28, 0, 0, false, 0),
];

/// Whether `rate` is one of the GST slabs.
#[must_use]
pub fn is_gst_slab(rate: Decimal) -> bool {
    GST_SLABS.contains(&rate)
}

/// One line of a cart, priced for the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    /// Set when the line is a constituent of a combo offer.
    pub combo_id: Option<ComboId>,
    pub name: String,
    pub hsn_code: Option<String>,
    /// List price (MRP) per unit.
    pub list_price: Decimal,
    /// GST-inclusive price per unit the buyer pays before cart discounts.
    pub unit_price: Decimal,
    pub quantity: u32,
    /// GST rate in percent.
    pub gst_rate: Decimal,
}

impl CartLine {
    /// `unit_price * quantity`, rounded.
    #[must_use]
    pub fn gross(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }
}

/// A cart-level discount keyed in by a cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ManualDiscount {
    Percentage(Decimal),
    Flat(Decimal),
}

/// Discounts and fees applied on top of the lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustments {
    pub coupon_discount: Decimal,
    /// Product the coupon is bound to; `None` for store-wide coupons.
    #[serde(default)]
    pub coupon_scope: Option<ProductId>,
    pub manual_discount: Option<ManualDiscount>,
    pub delivery_fee: Decimal,
}

/// Split a GST-inclusive amount into `(taxable value, gst)`.
#[must_use]
pub fn split_inclusive(amount: Decimal, gst_rate: Decimal) -> (Decimal, Decimal) {
    let taxable = round_money(amount * Decimal::ONE_HUNDRED / (Decimal::ONE_HUNDRED + gst_rate));
    (taxable, amount - taxable)
}

/// A cart line with its share of discounts and its tax split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    #[serde(flatten)]
    pub line: CartLine,
    pub gross: Decimal,
    pub discount: Decimal,
    pub net: Decimal,
    pub taxable_value: Decimal,
    pub gst_amount: Decimal,
}

/// Totals for a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub lines: Vec<PricedLine>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub coupon_discount: Decimal,
    pub manual_discount: Decimal,
    pub total_discount: Decimal,
    pub taxable_total: Decimal,
    pub gst_total: Decimal,
    pub delivery_fee: Decimal,
    pub grand_total: Decimal,
    pub round_off: Decimal,
    pub payable: Decimal,
}

impl CartTotals {
    /// Total a cart.
    ///
    /// An empty cart totals to zero; callers that must not accept an empty
    /// cart (checkout, POS sale) use [`ensure_not_empty`].
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] for zero quantities, GST rates outside the slabs
    /// or a negative manual discount.
    pub fn compute(lines: Vec<CartLine>, adjustments: &Adjustments) -> Result<Self, CartError> {
        for line in &lines {
            if line.quantity == 0 {
                return Err(CartError::InvalidQuantity {
                    name: line.name.clone(),
                });
            }
            if !is_gst_slab(line.gst_rate) {
                return Err(CartError::InvalidGstRate {
                    name: line.name.clone(),
                    rate: line.gst_rate,
                });
            }
        }

        let grosses: Vec<Decimal> = lines.iter().map(CartLine::gross).collect();
        let subtotal: Decimal = grosses.iter().copied().sum();

        let coupon_weights = coupon_weights(&lines, &grosses, adjustments.coupon_scope);
        let coupon_base: Decimal = coupon_weights.iter().copied().sum();
        let coupon_discount =
            round_money(adjustments.coupon_discount.max(Decimal::ZERO)).min(coupon_base);
        let coupon_shares = allocate_proportionally(coupon_discount, &coupon_weights);
        let after_coupon = subtotal - coupon_discount;
        let manual_discount = match adjustments.manual_discount {
            None => Decimal::ZERO,
            Some(ManualDiscount::Percentage(p) | ManualDiscount::Flat(p)) if p < Decimal::ZERO => {
                return Err(CartError::NegativeDiscount);
            }
            Some(ManualDiscount::Percentage(percent)) => percent_of(after_coupon, percent),
            Some(ManualDiscount::Flat(amount)) => round_money(amount).min(after_coupon),
        };
        let total_discount = coupon_discount + manual_discount;

        let remaining: Vec<Decimal> = grosses
            .iter()
            .zip(&coupon_shares)
            .map(|(gross, share)| gross - share)
            .collect();
        let manual_shares = allocate_proportionally(manual_discount, &remaining);

        let mut priced = Vec::with_capacity(lines.len());
        for (((line, gross), coupon_share), manual_share) in lines
            .into_iter()
            .zip(grosses)
            .zip(coupon_shares)
            .zip(manual_shares)
        {
            let discount = coupon_share + manual_share;
            let net = gross - discount;
            let (taxable_value, gst_amount) = split_inclusive(net, line.gst_rate);
            priced.push(PricedLine {
                line,
                gross,
                discount,
                net,
                taxable_value,
                gst_amount,
            });
        }

        let item_count = priced
            .iter()
            .fold(0u32, |count, p| count.saturating_add(p.line.quantity));
        let taxable_total: Decimal = priced.iter().map(|p| p.taxable_value).sum();
        let gst_total: Decimal = priced.iter().map(|p| p.gst_amount).sum();
        let delivery_fee = round_money(adjustments.delivery_fee.max(Decimal::ZERO));
        let grand_total = subtotal - total_discount + delivery_fee;
        let payable = round_rupee(grand_total);

        Ok(Self {
            lines: priced,
            item_count,
            subtotal,
            coupon_discount,
            manual_discount,
            total_discount,
            taxable_total,
            gst_total,
            delivery_fee,
            grand_total,
            round_off: payable - grand_total,
            payable,
        })
    }

    /// Merchandise value after discounts, before delivery.
    #[must_use]
    pub fn net_merchandise(&self) -> Decimal {
        self.subtotal - self.total_discount
    }
}

/// Weights for spreading a coupon: each line's gross, or only the standalone
/// lines of the bound product when the coupon has a scope.
///
/// A scope matching no standalone line falls back to the whole cart so the
/// evaluated discount is never lost.
fn coupon_weights(
    lines: &[CartLine],
    grosses: &[Decimal],
    scope: Option<ProductId>,
) -> Vec<Decimal> {
    let Some(product_id) = scope else {
        return grosses.to_vec();
    };
    let scoped: Vec<Decimal> = lines
        .iter()
        .zip(grosses)
        .map(|(line, gross)| {
            if line.product_id == product_id && line.combo_id.is_none() {
                *gross
            } else {
                Decimal::ZERO
            }
        })
        .collect();
    if scoped.iter().all(Decimal::is_zero) {
        grosses.to_vec()
    } else {
        scoped
    }
}

/// Round an amount to the nearest whole rupee.
#[must_use]
pub fn round_rupee(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Reject an empty cart.
///
/// # Errors
///
/// Returns [`CartError::Empty`] when there are no lines.
pub fn ensure_not_empty<T>(lines: &[T]) -> Result<(), CartError> {
    if lines.is_empty() {
        Err(CartError::Empty)
    } else {
        Ok(())
    }
}

/// Store-wide delivery charges for online orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPolicy {
    pub default_fee: Decimal,
    /// Orders whose net merchandise reaches this amount ship free.
    pub free_delivery_threshold: Option<Decimal>,
}

/// The delivery fee for an order.
///
/// POS sales never pay delivery. Active subscribers pay their subscription
/// fee when one is set. Everyone else pays the store default unless the
/// order reaches the free delivery threshold.
#[must_use]
pub fn delivery_fee_for(
    channel: OrderChannel,
    customer: Option<&CustomerPricing>,
    net_merchandise: Decimal,
    policy: &DeliveryPolicy,
    now: chrono::DateTime<chrono::Utc>,
) -> Decimal {
    if channel == OrderChannel::Pos {
        return Decimal::ZERO;
    }

    if let Some(fee) = customer
        .and_then(|c| c.active_subscription(now))
        .and_then(|terms| terms.delivery_fee)
    {
        return fee.max(Decimal::ZERO);
    }

    match policy.free_delivery_threshold {
        Some(threshold) if net_merchandise >= threshold => Decimal::ZERO,
        _ => policy.default_fee,
    }
}

/// Units required per product across all lines (combo constituents included).
#[must_use]
pub fn required_stock(lines: &[CartLine]) -> BTreeMap<ProductId, u32> {
    let mut required = BTreeMap::new();
    for line in lines {
        let entry = required.entry(line.product_id).or_insert(0u32);
        *entry = entry.saturating_add(line.quantity);
    }
    required
}

/// Check that `requested` units of a product can be fulfilled.
///
/// # Errors
///
/// Returns [`CartError::InsufficientStock`] when stock is short.
pub fn check_stock(name: &str, requested: u32, available: i32) -> Result<(), CartError> {
    let enough = u32::try_from(available).is_ok_and(|available| available >= requested);
    if enough {
        Ok(())
    } else {
        Err(CartError::InsufficientStock {
            name: name.to_owned(),
            requested,
            available,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::pricing::SubscriptionTerms;
    use crate::types::{CustomerType, DiscountType};

    fn line(id: i32, unit_price: Decimal, quantity: u32, gst_rate: Decimal) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            combo_id: None,
            name: format!("Product {id}"),
            hsn_code: None,
            list_price: unit_price,
            unit_price,
            quantity,
            gst_rate,
        }
    }

    #[test]
    fn test_split_inclusive() {
        assert_eq!(split_inclusive(dec!(118), dec!(18)), (dec!(100.00), dec!(18.00)));
        assert_eq!(split_inclusive(dec!(105), dec!(5)), (dec!(100.00), dec!(5.00)));
        assert_eq!(split_inclusive(dec!(50), Decimal::ZERO), (dec!(50.00), dec!(0.00)));
    }

    #[test]
    fn test_totals_without_discount() {
        let totals = CartTotals::compute(
            vec![line(1, dec!(118), 2, dec!(18)), line(2, dec!(105), 1, dec!(5))],
            &Adjustments::default(),
        )
        .unwrap();

        assert_eq!(totals.subtotal, dec!(341));
        assert_eq!(totals.taxable_total, dec!(300));
        assert_eq!(totals.gst_total, dec!(41));
        assert_eq!(totals.grand_total, dec!(341));
        assert_eq!(totals.payable, dec!(341));
        assert_eq!(totals.round_off, Decimal::ZERO);
        assert_eq!(totals.item_count, 3);
    }

    #[test]
    fn test_discount_allocated_proportionally() {
        let totals = CartTotals::compute(
            vec![line(1, dec!(300), 1, dec!(18)), line(2, dec!(100), 1, dec!(5))],
            &Adjustments {
                coupon_discount: dec!(40),
                ..Adjustments::default()
            },
        )
        .unwrap();

        let discounts: Vec<Decimal> = totals.lines.iter().map(|l| l.discount).collect();
        assert_eq!(discounts, vec![dec!(30), dec!(10)]);
        assert_eq!(totals.lines.first().unwrap().net, dec!(270));
        assert_eq!(totals.total_discount, dec!(40));
        assert_eq!(totals.grand_total, dec!(360));
        let reconciled: Decimal = totals
            .lines
            .iter()
            .map(|l| l.taxable_value + l.gst_amount)
            .sum();
        assert_eq!(reconciled, totals.net_merchandise());
    }

    #[test]
    fn test_product_coupon_stays_on_bound_line() {
        let totals = CartTotals::compute(
            vec![line(1, dec!(118), 1, dec!(18)), line(2, dec!(1050), 1, dec!(5))],
            &Adjustments {
                coupon_discount: dec!(59),
                coupon_scope: Some(ProductId::new(1)),
                ..Adjustments::default()
            },
        )
        .unwrap();

        let bound = totals.lines.first().unwrap();
        assert_eq!(bound.discount, dec!(59));
        assert_eq!(bound.taxable_value, dec!(50));
        assert_eq!(bound.gst_amount, dec!(9));
        let other = totals.lines.get(1).unwrap();
        assert_eq!(other.discount, Decimal::ZERO);
        assert_eq!(other.taxable_value, dec!(1000));
        assert_eq!(other.gst_amount, dec!(50));
        assert_eq!(totals.gst_total, dec!(59));
        assert_eq!(totals.grand_total, dec!(1109));
    }

    #[test]
    fn test_product_coupon_skips_combo_lines() {
        let mut in_combo = line(1, dec!(100), 1, dec!(12));
        in_combo.combo_id = Some(ComboId::new(3));
        let totals = CartTotals::compute(
            vec![
                line(1, dec!(100), 1, dec!(12)),
                in_combo,
                line(2, dec!(100), 1, dec!(5)),
            ],
            &Adjustments {
                coupon_discount: dec!(10),
                coupon_scope: Some(ProductId::new(1)),
                ..Adjustments::default()
            },
        )
        .unwrap();
        let discounts: Vec<Decimal> = totals.lines.iter().map(|l| l.discount).collect();
        assert_eq!(discounts, vec![dec!(10), Decimal::ZERO, Decimal::ZERO]);
    }

    #[test]
    fn test_product_coupon_capped_at_bound_lines() {
        let totals = CartTotals::compute(
            vec![line(1, dec!(30), 1, dec!(18)), line(2, dec!(500), 1, dec!(5))],
            &Adjustments {
                coupon_discount: dec!(50),
                coupon_scope: Some(ProductId::new(1)),
                ..Adjustments::default()
            },
        )
        .unwrap();
        assert_eq!(totals.coupon_discount, dec!(30));
        assert_eq!(totals.lines.get(1).unwrap().discount, Decimal::ZERO);
    }

    #[test]
    fn test_manual_discount_spreads_over_what_coupon_left() {
        let totals = CartTotals::compute(
            vec![line(1, dec!(118), 1, dec!(18)), line(2, dec!(1050), 1, dec!(5))],
            &Adjustments {
                coupon_discount: dec!(59),
                coupon_scope: Some(ProductId::new(1)),
                manual_discount: Some(ManualDiscount::Flat(dec!(100))),
                delivery_fee: Decimal::ZERO,
            },
        )
        .unwrap();
        let discounts: Vec<Decimal> = totals.lines.iter().map(|l| l.discount).collect();
        assert_eq!(discounts, vec![dec!(64.32), dec!(94.68)]);
        assert_eq!(totals.total_discount, dec!(159));
        let reconciled: Decimal = totals
            .lines
            .iter()
            .map(|l| l.taxable_value + l.gst_amount)
            .sum();
        assert_eq!(reconciled, totals.net_merchandise());
    }

    #[test]
    fn test_unmatched_scope_spreads_over_cart() {
        let totals = CartTotals::compute(
            vec![line(2, dec!(100), 1, dec!(5))],
            &Adjustments {
                coupon_discount: dec!(10),
                coupon_scope: Some(ProductId::new(9)),
                ..Adjustments::default()
            },
        )
        .unwrap();
        assert_eq!(totals.lines.first().unwrap().discount, dec!(10));
    }

    #[test]
    fn test_manual_discount_after_coupon() {
        let totals = CartTotals::compute(
            vec![line(1, dec!(200), 1, dec!(12))],
            &Adjustments {
                coupon_discount: dec!(20),
                coupon_scope: None,
                manual_discount: Some(ManualDiscount::Percentage(dec!(10))),
                delivery_fee: Decimal::ZERO,
            },
        )
        .unwrap();
        assert_eq!(totals.manual_discount, dec!(18));
        assert_eq!(totals.total_discount, dec!(38));
        assert_eq!(totals.grand_total, dec!(162));
    }

    #[test]
    fn test_discount_capped_at_subtotal() {
        let totals = CartTotals::compute(
            vec![line(1, dec!(99), 1, dec!(5))],
            &Adjustments {
                coupon_discount: dec!(150),
                coupon_scope: None,
                manual_discount: Some(ManualDiscount::Flat(dec!(10))),
                delivery_fee: dec!(25),
            },
        )
        .unwrap();
        assert_eq!(totals.total_discount, dec!(99));
        assert_eq!(totals.gst_total, Decimal::ZERO);
        assert_eq!(totals.grand_total, dec!(25));
    }

    #[test]
    fn test_round_off_to_rupee() {
        let totals = CartTotals::compute(
            vec![line(1, dec!(99.60), 1, dec!(18))],
            &Adjustments::default(),
        )
        .unwrap();
        assert_eq!(totals.payable, dec!(100));
        assert_eq!(totals.round_off, dec!(0.40));

        let totals = CartTotals::compute(
            vec![line(1, dec!(99.40), 1, dec!(18))],
            &Adjustments::default(),
        )
        .unwrap();
        assert_eq!(totals.payable, dec!(99));
        assert_eq!(totals.round_off, dec!(-0.40));
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert!(matches!(
            CartTotals::compute(vec![line(1, dec!(10), 0, dec!(5))], &Adjustments::default()),
            Err(CartError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            CartTotals::compute(vec![line(1, dec!(10), 1, dec!(7))], &Adjustments::default()),
            Err(CartError::InvalidGstRate { .. })
        ));
        assert_eq!(
            CartTotals::compute(
                vec![line(1, dec!(10), 1, dec!(5))],
                &Adjustments {
                    manual_discount: Some(ManualDiscount::Flat(dec!(-1))),
                    ..Adjustments::default()
                }
            ),
            Err(CartError::NegativeDiscount)
        );
    }

    #[test]
    fn test_empty_cart() {
        let totals = CartTotals::compute(Vec::new(), &Adjustments::default()).unwrap();
        assert_eq!(totals.payable, Decimal::ZERO);
        assert_eq!(ensure_not_empty::<CartLine>(&[]), Err(CartError::Empty));
    }

    #[test]
    fn test_gst_slabs() {
        assert!(is_gst_slab(dec!(28)));
        assert!(is_gst_slab(dec!(18)));
        assert!(is_gst_slab(dec!(18.00)));
        assert!(!is_gst_slab(dec!(10)));
    }

    #[test]
    fn test_delivery_fee_rules() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).single().unwrap();
        let policy = DeliveryPolicy {
            default_fee: dec!(40),
            free_delivery_threshold: Some(dec!(499)),
        };
        assert_eq!(
            delivery_fee_for(OrderChannel::Online, None, dec!(200), &policy, now),
            dec!(40)
        );
        assert_eq!(
            delivery_fee_for(OrderChannel::Online, None, dec!(499), &policy, now),
            Decimal::ZERO
        );
        assert_eq!(
            delivery_fee_for(OrderChannel::Pos, None, dec!(10), &policy, now),
            Decimal::ZERO
        );

        let subscriber = CustomerPricing {
            customer_type: CustomerType::Subscription,
            subscription: Some(SubscriptionTerms {
                discount_type: DiscountType::Percentage,
                discount_value: dec!(5),
                sale_discount_value: None,
                delivery_fee: Some(dec!(15)),
                delivery_schedule: None,
                starts_at: None,
                ends_at: None,
            }),
            category_discounts: Vec::new(),
        };
        assert_eq!(
            delivery_fee_for(OrderChannel::Online, Some(&subscriber), dec!(900), &policy, now),
            dec!(15)
        );
    }

    #[test]
    fn test_stock_checks() {
        let mut combo_part = line(1, dec!(50), 2, dec!(5));
        combo_part.combo_id = Some(ComboId::new(3));
        let lines = vec![line(1, dec!(60), 1, dec!(5)), combo_part, line(2, dec!(10), 4, dec!(0))];
        let required = required_stock(&lines);
        assert_eq!(required.get(&ProductId::new(1)), Some(&3));
        assert_eq!(required.get(&ProductId::new(2)), Some(&4));

        assert!(check_stock("Ghee", 3, 3).is_ok());
        assert!(check_stock("Ghee", 4, 3).is_err());
        assert!(check_stock("Ghee", 1, -2).is_err());
    }
}
