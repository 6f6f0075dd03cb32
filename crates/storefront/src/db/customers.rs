//! Customer repository.

use sqlx::PgPool;

use bazaar_core::catalog::Customer;
use bazaar_core::pricing::{CategoryDiscount, CustomerPricing};
use bazaar_core::{Email, UserId};

use super::{RepositoryError, conflict_on_unique};

const CUSTOMER_COLUMNS: &str = r"
    id, email, name, phone, address, state_code, gstin, customer_type,
    discount_type, discount_value, sale_discount_value, delivery_fee,
    delivery_schedule, subscription_starts_at, subscription_ends_at, created_at
";

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    customer: Customer,
    password_hash: String,
}

/// Repository for customer accounts.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a regular customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        phone: Option<&str>,
        password_hash: &str,
    ) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(&format!(
            r"
            INSERT INTO shop.customer (email, name, phone, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(email)
        .bind(name)
        .bind(phone)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))
    }

    /// Get a customer and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(Customer, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialsRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS}, password_hash FROM shop.customer WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.customer, r.password_hash)))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM shop.customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(customer)
    }

    /// Per-category subscription overrides for a customer.
    ///
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

    /// Everything needed to price products for a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer no longer exists.
    pub async fn pricing(&self, id: UserId) -> Result<(Customer, CustomerPricing), RepositoryError> {
        let customer = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        let overrides = self.category_discounts(id).await?;
        let pricing = customer.pricing(overrides);
        Ok((customer, pricing))
    }
}
