//! Coupon classification and evaluation.
//!
//! A coupon's usage class is never stored. It is inferred from which of
//! `product_id`, `min_quantity` and `min_cart_total` are set:
//!
//! | `product_id` | `min_quantity` | `min_cart_total` | Class        |
//! |--------------|----------------|------------------|--------------|
//! | set          | unset          | unset            | `Product`    |
//! | set          | set            | unset            | `Bulk`       |
//! | unset        | unset          | any              | `StoreWide`  |
//!
//! Any other combination is rejected as ambiguous.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::discount_amount;
use crate::types::{CouponId, DiscountType, ProductId};

/// Errors raised when defining or redeeming a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("coupon must bind a product, a product with a minimum quantity, or neither")]
    AmbiguousUsage,
    #[error("minimum quantity must be at least 1")]
    InvalidMinQuantity,
    #[error("percentage coupons must be between 0 and 100, fixed coupons must be positive")]
    InvalidValue,
    #[error("coupon code must be 3-32 letters, digits or dashes")]
    InvalidCode,
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotYetValid,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("coupon applies to a product that is not in the cart")]
    ProductNotInCart,
    #[error("coupon requires at least {required} units (cart has {actual})")]
    MinQuantityNotMet { required: u32, actual: u32 },
    #[error("coupon requires a cart total of at least {required} (cart is {actual})")]
    MinCartTotalNotMet { required: Decimal, actual: Decimal },
}

/// The usage class of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CouponKind {
    /// Discounts one product's line.
    Product { product_id: ProductId },
    /// Discounts one product's line once enough units are bought.
    Bulk {
        product_id: ProductId,
        min_quantity: u32,
    },
    /// Discounts the whole cart, optionally above a minimum total.
    StoreWide { min_cart_total: Option<Decimal> },
}

impl CouponKind {
    /// Infer the usage class from the nullable coupon columns.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::AmbiguousUsage`] for combinations outside the
    /// three classes and [`CouponError::InvalidMinQuantity`] for a
    /// non-positive minimum quantity.
    pub fn classify(
        product_id: Option<ProductId>,
        min_quantity: Option<i32>,
        min_cart_total: Option<Decimal>,
    ) -> Result<Self, CouponError> {
        match (product_id, min_quantity, min_cart_total) {
            (Some(product_id), None, None) => Ok(Self::Product { product_id }),
            (Some(product_id), Some(min_quantity), None) => {
                let min_quantity = u32::try_from(min_quantity)
                    .ok()
                    .filter(|quantity| *quantity > 0)
                    .ok_or(CouponError::InvalidMinQuantity)?;
                Ok(Self::Bulk {
                    product_id,
                    min_quantity,
                })
            }
            (None, None, min_cart_total) => Ok(Self::StoreWide { min_cart_total }),
            _ => Err(CouponError::AmbiguousUsage),
        }
    }

    /// The product this coupon is bound to, if any.
    #[must_use]
    pub const fn product_id(&self) -> Option<ProductId> {
        match self {
            Self::Product { product_id } | Self::Bulk { product_id, .. } => Some(*product_id),
            Self::StoreWide { .. } => None,
        }
    }
}

/// A coupon as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub product_id: Option<ProductId>,
    pub min_quantity: Option<i32>,
    pub min_cart_total: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub active: bool,
}

/// A cart line as seen by coupon evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// GST-inclusive line total after customer pricing.
    pub line_total: Decimal,
}

/// The result of redeeming a coupon against a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponDiscount {
    pub coupon_id: CouponId,
    pub code: String,
    pub kind: CouponKind,
    pub amount: Decimal,
}

impl CouponDiscount {
    /// The product whose lines carry this discount; `None` spreads it over
    /// the whole cart.
    #[must_use]
    pub const fn scope(&self) -> Option<ProductId> {
        self.kind.product_id()
    }
}

/// Normalize a code as typed by a customer or cashier.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Validate the definition of a coupon before it is stored.
///
/// # Errors
///
/// Returns the first [`CouponError`] found in the code, value or usage fields.
pub fn validate_definition(
    code: &str,
    discount_type: DiscountType,
    value: Decimal,
    product_id: Option<ProductId>,
    min_quantity: Option<i32>,
    min_cart_total: Option<Decimal>,
) -> Result<CouponKind, CouponError> {
    let code = normalize_code(code);
    let code_ok = (3..=32).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !code_ok {
        return Err(CouponError::InvalidCode);
    }

    let value_ok = match discount_type {
        DiscountType::Percentage => value > Decimal::ZERO && value <= Decimal::ONE_HUNDRED,
        DiscountType::Fixed => value > Decimal::ZERO,
    };
    if !value_ok {
        return Err(CouponError::InvalidValue);
    }

    if min_cart_total.is_some_and(|total| total < Decimal::ZERO) {
        return Err(CouponError::InvalidValue);
    }

    CouponKind::classify(product_id, min_quantity, min_cart_total)
}

impl Coupon {
    /// The usage class of this coupon.
    ///
    /// # Errors
    ///
    /// See [`CouponKind::classify`].
    pub fn kind(&self) -> Result<CouponKind, CouponError> {
        CouponKind::classify(self.product_id, self.min_quantity, self.min_cart_total)
    }

    fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), CouponError> {
        if !self.active {
            return Err(CouponError::Inactive);
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return Err(CouponError::NotYetValid);
        }
        if self.expires_at.is_some_and(|end| now >= end) {
            return Err(CouponError::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(CouponError::UsageLimitReached);
        }
        Ok(())
    }

    /// Redeem this coupon against a cart.
    ///
    /// `lines` are the standalone product lines of the cart (combo components
    /// are excluded); `subtotal` is the whole cart's GST-inclusive subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponError`] explaining why the coupon cannot be used.
    pub fn evaluate(
        &self,
        lines: &[CouponLine],
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<CouponDiscount, CouponError> {
        let kind = self.kind()?;
        self.check_redeemable(now)?;

        let base = match kind {
            CouponKind::Product { product_id } | CouponKind::Bulk { product_id, .. } => {
                let (quantity, total) = lines
                    .iter()
                    .filter(|line| line.product_id == product_id)
                    .fold((0u32, Decimal::ZERO), |(q, t), line| {
                        (q.saturating_add(line.quantity), t + line.line_total)
                    });
                if quantity == 0 {
                    return Err(CouponError::ProductNotInCart);
                }
                if let CouponKind::Bulk { min_quantity, .. } = kind
                    && quantity < min_quantity
                {
                    return Err(CouponError::MinQuantityNotMet {
                        required: min_quantity,
                        actual: quantity,
                    });
                }
                total
            }
            CouponKind::StoreWide { min_cart_total } => {
                if let Some(required) = min_cart_total
                    && subtotal < required
                {
                    return Err(CouponError::MinCartTotalNotMet {
                        required,
                        actual: subtotal,
                    });
                }
                subtotal
            }
        };

        Ok(CouponDiscount {
            coupon_id: self.id,
            code: self.code.clone(),
            kind,
            amount: discount_amount(base, self.discount_type, self.value),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).single().unwrap()
    }

    fn coupon() -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "SAVE10".to_string(),
            discount_type: DiscountType::Percentage,
            value: dec!(10),
            product_id: None,
            min_quantity: None,
            min_cart_total: None,
            starts_at: None,
            expires_at: None,
            usage_limit: None,
            used_count: 0,
            active: true,
        }
    }

    fn lines() -> Vec<CouponLine> {
        vec![
            CouponLine {
                product_id: ProductId::new(1),
                quantity: 2,
                line_total: dec!(300),
            },
            CouponLine {
                product_id: ProductId::new(2),
                quantity: 1,
                line_total: dec!(100),
            },
        ]
    }

    #[test]
    fn test_classify_three_classes() {
        let p = Some(ProductId::new(5));
        assert_eq!(
            CouponKind::classify(p, None, None),
            Ok(CouponKind::Product {
                product_id: ProductId::new(5)
            })
        );
        assert_eq!(
            CouponKind::classify(p, Some(3), None),
            Ok(CouponKind::Bulk {
                product_id: ProductId::new(5),
                min_quantity: 3
            })
        );
        assert_eq!(
            CouponKind::classify(None, None, Some(dec!(500))),
            Ok(CouponKind::StoreWide {
                min_cart_total: Some(dec!(500))
            })
        );
        assert_eq!(
            CouponKind::classify(None, None, None),
            Ok(CouponKind::StoreWide {
                min_cart_total: None
            })
        );
    }

    #[test]
    fn test_classify_rejects_ambiguous() {
        assert_eq!(
            CouponKind::classify(None, Some(2), None),
            Err(CouponError::AmbiguousUsage)
        );
        assert_eq!(
            CouponKind::classify(Some(ProductId::new(1)), None, Some(dec!(10))),
            Err(CouponError::AmbiguousUsage)
        );
        assert_eq!(
            CouponKind::classify(Some(ProductId::new(1)), Some(0), None),
            Err(CouponError::InvalidMinQuantity)
        );
    }

    #[test]
    fn test_store_wide_discount() {
        let discount = coupon().evaluate(&lines(), dec!(400), now()).unwrap();
        assert_eq!(discount.amount, dec!(40));
    }

    #[test]
    fn test_store_wide_minimum_total() {
        let mut c = coupon();
        c.min_cart_total = Some(dec!(500));
        assert_eq!(
            c.evaluate(&lines(), dec!(400), now()),
            Err(CouponError::MinCartTotalNotMet {
                required: dec!(500),
                actual: dec!(400)
            })
        );
    }

    #[test]
    fn test_product_coupon_discounts_only_its_line() {
        let mut c = coupon();
        c.product_id = Some(ProductId::new(1));
        c.discount_type = DiscountType::Fixed;
        c.value = dec!(50);
        let discount = c.evaluate(&lines(), dec!(400), now()).unwrap();
        assert_eq!(discount.amount, dec!(50));
        assert_eq!(discount.kind.product_id(), Some(ProductId::new(1)));

        c.product_id = Some(ProductId::new(9));
        assert_eq!(
            c.evaluate(&lines(), dec!(400), now()),
            Err(CouponError::ProductNotInCart)
        );
    }

    #[test]
    fn test_bulk_coupon_requires_quantity() {
        let mut c = coupon();
        c.product_id = Some(ProductId::new(1));
        c.min_quantity = Some(3);
        assert_eq!(
            c.evaluate(&lines(), dec!(400), now()),
            Err(CouponError::MinQuantityNotMet {
                required: 3,
                actual: 2
            })
        );

        c.min_quantity = Some(2);
        let discount = c.evaluate(&lines(), dec!(400), now()).unwrap();
        assert_eq!(discount.amount, dec!(30));
    }

    #[test]
    fn test_fixed_discount_capped_at_base() {
        let mut c = coupon();
        c.discount_type = DiscountType::Fixed;
        c.value = dec!(1000);
        let discount = c.evaluate(&lines(), dec!(400), now()).unwrap();
        assert_eq!(discount.amount, dec!(400));
    }

    #[test]
    fn test_redeemability_checks() {
        let mut c = coupon();
        c.active = false;
        assert_eq!(c.evaluate(&lines(), dec!(400), now()), Err(CouponError::Inactive));

        let mut c = coupon();
        c.starts_at = Some(now() + Duration::days(1));
        assert_eq!(
            c.evaluate(&lines(), dec!(400), now()),
            Err(CouponError::NotYetValid)
        );

        let mut c = coupon();
        c.expires_at = Some(now() - Duration::days(1));
        assert_eq!(c.evaluate(&lines(), dec!(400), now()), Err(CouponError::Expired));

        let mut c = coupon();
        c.expires_at = Some(now());
        assert_eq!(c.evaluate(&lines(), dec!(400), now()), Err(CouponError::Expired));
        c.starts_at = Some(now());
        c.expires_at = Some(now() + Duration::seconds(1));
        assert!(c.evaluate(&lines(), dec!(400), now()).is_ok());

        let mut c = coupon();
        c.usage_limit = Some(5);
        c.used_count = 5;
        assert_eq!(
            c.evaluate(&lines(), dec!(400), now()),
            Err(CouponError::UsageLimitReached)
        );
    }

    #[test]
    fn test_validate_definition() {
        assert!(
            validate_definition(" diwali-25 ", DiscountType::Percentage, dec!(25), None, None, None)
                .is_ok()
        );
        assert_eq!(
            validate_definition("X", DiscountType::Fixed, dec!(5), None, None, None),
            Err(CouponError::InvalidCode)
        );
        assert_eq!(
            validate_definition("BIG", DiscountType::Percentage, dec!(120), None, None, None),
            Err(CouponError::InvalidValue)
        );
        assert_eq!(
            validate_definition("BULK", DiscountType::Fixed, dec!(5), None, Some(3), None),
            Err(CouponError::AmbiguousUsage)
        );
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
    }
}
