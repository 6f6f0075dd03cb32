//! Catalog management: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::cart::is_gst_slab;
use bazaar_core::catalog::{Category, Product, slugify};
use bazaar_core::combo::{ComboComponent, ComboOffer};
use bazaar_core::{CategoryId, ProductId};

use super::{RepositoryError, conflict_on_constraint};

const PRODUCT_COLUMNS: &str = r"
    id, category_id, name, slug, description, image_url, price, sale_price,
    sale_starts_at, sale_ends_at, retailer_price, distributor_price, stock,
    gst_rate, hsn_code, is_featured, is_trending, is_new, active
";

/// Rejections for product and category input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogInputError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("slug must contain at least one letter or digit")]
    EmptySlug,
    #[error("prices must not be negative")]
    NegativePrice,
    #[error("GST rate {0} is not one of 0, 5, 12, 18 or 28")]
    InvalidGstRate(Decimal),
    #[error("stock must not be negative")]
    NegativeStock,
    #[error("sale must end after it starts")]
    InvalidSaleWindow,
}

/// Fields accepted when creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub category_id: Option<CategoryId>,
    pub name: String,
    /// Derived from the name when absent.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub sale_starts_at: Option<DateTime<Utc>>,
    pub sale_ends_at: Option<DateTime<Utc>>,
    pub retailer_price: Option<Decimal>,
    pub distributor_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    pub gst_rate: Decimal,
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_trending: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl ProductInput {
    /// Check the input and return the slug it will be stored under.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogInputError`] found.
    pub fn validate(&self) -> Result<String, CatalogInputError> {
        if self.name.trim().is_empty() {
            return Err(CatalogInputError::EmptyName);
        }
        let slug = slugify(self.slug.as_deref().unwrap_or(&self.name));
        if slug.is_empty() {
            return Err(CatalogInputError::EmptySlug);
        }
        let prices = [
            Some(self.price),
            self.sale_price,
            self.retailer_price,
            self.distributor_price,
        ];
        if prices.iter().flatten().any(|p| *p < Decimal::ZERO) {
            return Err(CatalogInputError::NegativePrice);
        }
        if !is_gst_slab(self.gst_rate) {
            return Err(CatalogInputError::InvalidGstRate(self.gst_rate));
        }
        if self.stock < 0 {
            return Err(CatalogInputError::NegativeStock);
        }
        if let (Some(start), Some(end)) = (self.sale_starts_at, self.sale_ends_at)
            && end <= start
        {
            return Err(CatalogInputError::InvalidSaleWindow);
        }
        Ok(slug)
    }
}

/// Fields accepted when creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub position: i32,
}

impl CategoryInput {
    /// # Errors
    ///
    /// Returns [`CatalogInputError::EmptyName`] or [`CatalogInputError::EmptySlug`].
    pub fn validate(&self) -> Result<String, CatalogInputError> {
        if self.name.trim().is_empty() {
            return Err(CatalogInputError::EmptyName);
        }
        let slug = slugify(self.slug.as_deref().unwrap_or(&self.name));
        if slug.is_empty() {
            return Err(CatalogInputError::EmptySlug);
        }
        Ok(slug)
    }
}

/// Repository for catalog writes and back-office listings.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, position FROM shop.category ORDER BY position, name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_category(
        &self,
        input: &CategoryInput,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            INSERT INTO shop.category (name, slug, position)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, position
            ",
        )
        .bind(input.name.trim())
        .bind(slug)
        .bind(input.position)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "category slug already exists"))
    }

    /// Every product, inactive ones included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product ORDER BY name, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Active products with the given ids, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = ANY($1) AND active ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the
    /// category does not exist.
    pub async fn create_product(
        &self,
        input: &ProductInput,
        slug: &str,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO shop.product (
                category_id, name, slug, description, image_url, price, sale_price,
                sale_starts_at, sale_ends_at, retailer_price, distributor_price, stock,
                gst_rate, hsn_code, is_featured, is_trending, is_new, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(slug)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.price)
        .bind(input.sale_price)
        .bind(input.sale_starts_at)
        .bind(input.sale_ends_at)
        .bind(input.retailer_price)
        .bind(input.distributor_price)
        .bind(input.stock)
        .bind(input.gst_rate)
        .bind(input.hsn_code.as_deref())
        .bind(input.is_featured)
        .bind(input.is_trending)
        .bind(input.is_new)
        .bind(input.active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "product slug already exists or category is unknown"))
    }

    /// Replace every editable field of a product.
    ///
    /// Existing order items keep their own price and GST snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown product and
    /// `RepositoryError::Conflict` for a taken slug or unknown category.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
        slug: &str,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE shop.product
            SET category_id = $2, name = $3, slug = $4, description = $5, image_url = $6,
                price = $7, sale_price = $8, sale_starts_at = $9, sale_ends_at = $10,
                retailer_price = $11, distributor_price = $12, stock = $13, gst_rate = $14,
                hsn_code = $15, is_featured = $16, is_trending = $17, is_new = $18,
                active = $19, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(slug)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.price)
        .bind(input.sale_price)
        .bind(input.sale_starts_at)
        .bind(input.sale_ends_at)
        .bind(input.retailer_price)
        .bind(input.distributor_price)
        .bind(input.stock)
        .bind(input.gst_rate)
        .bind(input.hsn_code.as_deref())
        .bind(input.is_featured)
        .bind(input.is_trending)
        .bind(input.is_new)
        .bind(input.active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "product slug already exists or category is unknown"))?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Combo component data for the products a combo names.
#[must_use]
pub fn combo_components(product_ids: &[ProductId], products: &[Product]) -> Vec<ComboComponent> {
    product_ids
        .iter()
        .filter_map(|id| products.iter().find(|p| p.id == *id))
        .map(|p| ComboComponent {
            product_id: p.id,
            name: p.name.clone(),
            list_price: p.price,
            gst_rate: p.gst_rate,
            hsn_code: p.hsn_code.clone(),
        })
        .collect()
}

/// Components of a stored combo.
#[must_use]
pub fn offer_components(combo: &ComboOffer, products: &[Product]) -> Vec<ComboComponent> {
    combo_components(&combo.product_ids, products)
}
