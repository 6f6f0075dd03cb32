//! Coupon management.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use bazaar_core::coupon::{Coupon, CouponError, CouponKind, normalize_code, validate_definition};
use bazaar_core::{CouponId, DiscountType, ProductId};

use super::{RepositoryError, conflict_on_constraint};

const COUPON_COLUMNS: &str = r"
    id, code, discount_type, value, product_id, min_quantity, min_cart_total,
    starts_at, expires_at, usage_limit, used_count, active
";

/// Fields accepted when creating a coupon.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponInput {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub product_id: Option<ProductId>,
    pub min_quantity: Option<i32>,
    pub min_cart_total: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
}

impl CouponInput {
    /// Classify the coupon and check its code and value.
    ///
    /// # Errors
    ///
    /// Returns the [`CouponError`] that makes the definition unusable.
    pub fn validate(&self) -> Result<CouponKind, CouponError> {
        if self.usage_limit.is_some_and(|limit| limit < 0) {
            return Err(CouponError::InvalidValue);
        }
        validate_definition(
            &self.code,
            self.discount_type,
            self.value,
            self.product_id,
            self.min_quantity,
            self.min_cart_total,
        )
    }
}

/// Repository for coupons.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM shop.coupon ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Look up a coupon by code as typed at the till.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM shop.coupon WHERE code = $1"
        ))
        .bind(normalize_code(code))
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Store a coupon that has passed [`CouponInput::validate`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code exists or the bound
    /// product does not.
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            r"
            INSERT INTO shop.coupon (
                code, discount_type, value, product_id, min_quantity, min_cart_total,
                starts_at, expires_at, usage_limit
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COUPON_COLUMNS}
            "
        ))
        .bind(normalize_code(&input.code))
        .bind(input.discount_type)
        .bind(input.value)
        .bind(input.product_id)
        .bind(input.min_quantity)
        .bind(input.min_cart_total)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.usage_limit)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "coupon code already exists or product is unknown"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown coupon.
    pub async fn deactivate(&self, id: CouponId) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "UPDATE shop.coupon SET active = FALSE WHERE id = $1 RETURNING {COUPON_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn input() -> CouponInput {
        CouponInput {
            code: " diwali10 ".to_string(),
            discount_type: DiscountType::Percentage,
            value: dec!(10),
            product_id: None,
            min_quantity: None,
            min_cart_total: Some(dec!(999)),
            starts_at: None,
            expires_at: None,
            usage_limit: Some(100),
        }
    }

    #[test]
    fn test_store_wide_coupon() {
        assert_eq!(
            input().validate().unwrap(),
            CouponKind::StoreWide {
                min_cart_total: Some(dec!(999))
            }
        );
    }

    #[test]
    fn test_bulk_needs_a_product() {
        let mut c = input();
        c.min_cart_total = None;
        c.min_quantity = Some(6);
        assert_eq!(c.validate(), Err(CouponError::AmbiguousUsage));

        c.product_id = Some(ProductId::new(4));
        assert_eq!(
            c.validate().unwrap(),
            CouponKind::Bulk {
                product_id: ProductId::new(4),
                min_quantity: 6
            }
        );
    }

    #[test]
    fn test_negative_usage_limit_rejected() {
        let mut c = input();
        c.usage_limit = Some(-1);
        assert_eq!(c.validate(), Err(CouponError::InvalidValue));
    }

    #[test]
    fn test_percentage_over_hundred_rejected() {
        let mut c = input();
        c.value = dec!(120);
        assert_eq!(c.validate(), Err(CouponError::InvalidValue));
    }
}
