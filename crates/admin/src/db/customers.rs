//! Customers, their pricing tier and subscription terms.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::catalog::Customer;
use bazaar_core::pricing::{CategoryDiscount, CustomerPricing};
use bazaar_core::{CategoryId, CustomerType, DeliverySchedule, DiscountType, UserId};

use super::{RepositoryError, conflict_on_constraint};

const CUSTOMER_COLUMNS: &str = r"
    id, email, name, phone, address, state_code, gstin, customer_type,
    discount_type, discount_value, sale_discount_value, delivery_fee,
    delivery_schedule, subscription_starts_at, subscription_ends_at, created_at
";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingInputError {
    #[error("discount values must not be negative")]
    NegativeValue,
    #[error("percentage discounts cannot exceed 100")]
    PercentageTooLarge,
    #[error("delivery fee must not be negative")]
    NegativeDeliveryFee,
    #[error("subscription must end after it starts")]
    InvalidWindow,
}

fn check_discount(
    discount_type: DiscountType,
    values: &[Option<Decimal>],
) -> Result<(), PricingInputError> {
    for value in values.iter().flatten() {
        if *value < Decimal::ZERO {
            return Err(PricingInputError::NegativeValue);
        }
        if discount_type == DiscountType::Percentage && *value > Decimal::ONE_HUNDRED {
            return Err(PricingInputError::PercentageTooLarge);
        }
    }
    Ok(())
}

/// A customer's tier and subscription terms as set by the back office.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingTermsInput {
    pub customer_type: CustomerType,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount_value: Decimal,
    pub sale_discount_value: Option<Decimal>,
    pub delivery_fee: Option<Decimal>,
    pub delivery_schedule: Option<DeliverySchedule>,
    pub subscription_starts_at: Option<DateTime<Utc>>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
}

impl PricingTermsInput {
    /// # Errors
    ///
    /// Returns the first [`PricingInputError`] found.
    pub fn validate(&self) -> Result<(), PricingInputError> {
        check_discount(
            self.discount_type,
            &[Some(self.discount_value), self.sale_discount_value],
        )?;
        if self.delivery_fee.is_some_and(|fee| fee < Decimal::ZERO) {
            return Err(PricingInputError::NegativeDeliveryFee);
        }
        if let (Some(start), Some(end)) = (self.subscription_starts_at, self.subscription_ends_at)
            && end <= start
        {
            return Err(PricingInputError::InvalidWindow);
        }
        Ok(())
    }
}

/// A per-category override as posted by the back office.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDiscountInput {
    pub category_id: CategoryId,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub sale_discount_value: Option<Decimal>,
}

impl CategoryDiscountInput {
    /// # Errors
    ///
    /// Returns the first [`PricingInputError`] found.
    pub fn validate(&self) -> Result<(), PricingInputError> {
        check_discount(
            self.discount_type,
            &[Some(self.discount_value), self.sale_discount_value],
        )
    }
}

/// Repository for back-office customer management.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Customers, newest first, optionally filtered by name, email or phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>, limit: i64) -> Result<Vec<Customer>, RepositoryError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));
        let rows = sqlx::query_as::<_, Customer>(&format!(
            r"
            SELECT {CUSTOMER_COLUMNS}
            FROM shop.customer
            WHERE $1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 OR phone ILIKE $1
            ORDER BY created_at DESC
            LIMIT $2
            "
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM shop.customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Replace a customer's tier and subscription terms.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown customer.
    pub async fn update_pricing(
        &self,
        id: UserId,
        terms: &PricingTermsInput,
    ) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(&format!(
            r"
            UPDATE shop.customer
            SET customer_type = $2, discount_type = $3, discount_value = $4,
                sale_discount_value = $5, delivery_fee = $6, delivery_schedule = $7,
                subscription_starts_at = $8, subscription_ends_at = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(terms.customer_type)
        .bind(terms.discount_type)
        .bind(terms.discount_value)
        .bind(terms.sale_discount_value)
        .bind(terms.delivery_fee)
        .bind(terms.delivery_schedule)
        .bind(terms.subscription_starts_at)
        .bind(terms.subscription_ends_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_discounts(
        &self,
        id: UserId,
    ) -> Result<Vec<CategoryDiscount>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryDiscount>(
            r"
            SELECT category_id, discount_type, discount_value, sale_discount_value
            FROM shop.subscription_category_discount
            WHERE customer_id = $1
            ORDER BY category_id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create or replace the override for one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the customer or category does not exist.
    pub async fn upsert_category_discount(
        &self,
        id: UserId,
        input: &CategoryDiscountInput,
    ) -> Result<CategoryDiscount, RepositoryError> {
        sqlx::query_as::<_, CategoryDiscount>(
            r"
            INSERT INTO shop.subscription_category_discount (
                customer_id, category_id, discount_type, discount_value, sale_discount_value
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (customer_id, category_id) DO UPDATE
            SET discount_type = EXCLUDED.discount_type,
                discount_value = EXCLUDED.discount_value,
                sale_discount_value = EXCLUDED.sale_discount_value
            RETURNING category_id, discount_type, discount_value, sale_discount_value
            ",
        )
        .bind(id)
        .bind(input.category_id)
        .bind(input.discount_type)
        .bind(input.discount_value)
        .bind(input.sale_discount_value)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "customer or category does not exist"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there was no override to delete.
    pub async fn delete_category_discount(
        &self,
        id: UserId,
        category_id: CategoryId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM shop.subscription_category_discount WHERE customer_id = $1 AND category_id = $2",
        )
        .bind(id)
        .bind(category_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Everything needed to price a POS bill for a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown customer.
    pub async fn pricing(&self, id: UserId) -> Result<(Customer, CustomerPricing), RepositoryError> {
        let customer = self.get(id).await?.ok_or(RepositoryError::NotFound)?;
        let overrides = self.category_discounts(id).await?;
        let pricing = customer.pricing(overrides);
        Ok((customer, pricing))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn terms() -> PricingTermsInput {
        PricingTermsInput {
            customer_type: CustomerType::Subscription,
            discount_type: DiscountType::Percentage,
            discount_value: dec!(8),
            sale_discount_value: Some(dec!(3)),
            delivery_fee: Some(dec!(15)),
            delivery_schedule: Some(DeliverySchedule::Daily),
            subscription_starts_at: None,
            subscription_ends_at: None,
        }
    }

    #[test]
    fn test_valid_terms() {
        assert!(terms().validate().is_ok());
    }

    #[test]
    fn test_percentage_capped_at_hundred() {
        let mut t = terms();
        t.sale_discount_value = Some(dec!(101));
        assert_eq!(t.validate(), Err(PricingInputError::PercentageTooLarge));

        t.discount_type = DiscountType::Fixed;
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_window_must_be_ordered() {
        let mut t = terms();
        let now = Utc::now();
        t.subscription_starts_at = Some(now);
        t.subscription_ends_at = Some(now);
        assert_eq!(t.validate(), Err(PricingInputError::InvalidWindow));
    }

    #[test]
    fn test_regular_customer_defaults() {
        let t: PricingTermsInput =
            serde_json::from_value(serde_json::json!({ "customer_type": "retailer" })).unwrap();
        assert_eq!(t.discount_value, Decimal::ZERO);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_category_discount_rejects_negative() {
        let input = CategoryDiscountInput {
            category_id: CategoryId::new(2),
            discount_type: DiscountType::Fixed,
            discount_value: dec!(-5),
            sale_discount_value: None,
        };
        assert_eq!(input.validate(), Err(PricingInputError::NegativeValue));
    }
}
