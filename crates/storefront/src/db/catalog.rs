//! Read-only catalog, merchandising and coupon queries.

use sqlx::PgPool;

use bazaar_core::ProductId;
use bazaar_core::catalog::{Category, Product};
use bazaar_core::combo::{ComboComponent, ComboOffer};
use bazaar_core::coupon::Coupon;
use bazaar_core::layout::{Banner, HomeBlock};
use bazaar_core::ComboId;

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = r"
    id, category_id, name, slug, description, image_url, price, sale_price,
    sale_starts_at, sale_ends_at, retailer_price, distributor_price, stock,
    gst_rate, hsn_code, is_featured, is_trending, is_new, active
";

const COMBO_COLUMNS: &str = r"
    id, name, description, product_ids, combo_price, display_position, active,
    starts_at, ends_at
";

const COUPON_COLUMNS: &str = r"
    id, code, discount_type, value, product_id, min_quantity, min_cart_total,
    starts_at, expires_at, usage_limit, used_count, active
";

/// Catalog queries used by the public API.
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

    /// Active products, optionally limited to one category slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products(&self, category_slug: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM shop.product
            WHERE active
              AND ($1::text IS NULL OR category_id = (SELECT id FROM shop.category WHERE slug = $1))
            ORDER BY name
            "
        ))
        .bind(category_slug)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE slug = $1 AND active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Active products with the given ids, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
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

    /// Active banners in position order; schedule windows are checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn banners(&self) -> Result<Vec<Banner>, RepositoryError> {
        let rows = sqlx::query_as::<_, Banner>(
            r"
            SELECT id, title, image_url, link_url, position, display_width, alignment,
                   active, starts_at, ends_at
            FROM shop.banner
            WHERE active
            ORDER BY position, id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn home_blocks(&self) -> Result<Vec<HomeBlock>, RepositoryError> {
        let rows = sqlx::query_as::<_, HomeBlock>(
            r"
            SELECT id, kind, title, reference_id, position, display_width, alignment, active
            FROM shop.home_block
            WHERE active
            ORDER BY position, id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Active combos; schedule windows are checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn combos(&self) -> Result<Vec<ComboOffer>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComboOffer>(&format!(
            "SELECT {COMBO_COLUMNS} FROM shop.combo_offer WHERE active ORDER BY display_position, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn combos_by_ids(&self, ids: &[ComboId]) -> Result<Vec<ComboOffer>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ComboOffer>(&format!(
            "SELECT {COMBO_COLUMNS} FROM shop.combo_offer WHERE id = ANY($1) AND active"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM shop.coupon WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }
}

/// Combo component data for the products a combo names.
#[must_use]
pub fn combo_components(combo: &ComboOffer, products: &[Product]) -> Vec<ComboComponent> {
    combo
        .product_ids
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
