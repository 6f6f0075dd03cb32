//! Combo offers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use bazaar_core::combo::ComboOffer;
use bazaar_core::{ComboId, ProductId};

use super::{RepositoryError, conflict_on_constraint};

const COMBO_COLUMNS: &str = r"
    id, name, description, product_ids, combo_price, display_position, active,
    starts_at, ends_at
";

#[derive(Debug, Clone, Deserialize)]
pub struct ComboInput {
    pub name: String,
    pub description: Option<String>,
    pub product_ids: Vec<ProductId>,
    pub combo_price: Decimal,
    #[serde(default)]
    pub display_position: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Repository for combo offers.
pub struct ComboRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ComboRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every combo, inactive ones included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ComboOffer>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComboOffer>(&format!(
            "SELECT {COMBO_COLUMNS} FROM shop.combo_offer ORDER BY display_position, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ComboId) -> Result<Option<ComboOffer>, RepositoryError> {
        let row = sqlx::query_as::<_, ComboOffer>(&format!(
            "SELECT {COMBO_COLUMNS} FROM shop.combo_offer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Store a combo the caller has validated against the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &ComboInput) -> Result<ComboOffer, RepositoryError> {
        sqlx::query_as::<_, ComboOffer>(&format!(
            r"
            INSERT INTO shop.combo_offer (
                name, description, product_ids, combo_price, display_position, starts_at, ends_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COMBO_COLUMNS}
            "
        ))
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(&input.product_ids)
        .bind(input.combo_price)
        .bind(input.display_position)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "combo could not be stored"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown combo.
    pub async fn deactivate(&self, id: ComboId) -> Result<ComboOffer, RepositoryError> {
        sqlx::query_as::<_, ComboOffer>(&format!(
            "UPDATE shop.combo_offer SET active = FALSE WHERE id = $1 RETURNING {COMBO_COLUMNS}"
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

    #[test]
    fn test_combo_input_from_json() {
        let input: ComboInput = serde_json::from_value(serde_json::json!({
            "name": "Breakfast pack",
            "product_ids": [3, 7],
            "combo_price": "249.00"
        }))
        .unwrap();
        assert_eq!(input.product_ids, vec![ProductId::new(3), ProductId::new(7)]);
        assert_eq!(input.combo_price, dec!(249));
        assert_eq!(input.display_position, 0);
    }
}
