//! Catalog seeding from YAML.
//!
//! # File format
//!
//! ```yaml
//! categories:
//!   - name: Staples
//!     position: 1
//! products:
//!   - name: Toor Dal 1kg
//!     category: staples
//!     price: "160"
//!     retailer_price: "150"
//!     gst_rate: "5"
//!     stock: 40
//! coupons:
//!   - code: DAL10
//!     product: toor-dal-1kg
//!     discount_type: percentage
//!     value: "10"
//!     min_quantity: 2
//! ```
//!
//! Categories and products reference each other by slug. Amounts are quoted
//! so they load as exact decimals. Entries whose slug or code already exists
//! are skipped, so the same file can be loaded twice.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use bazaar_admin::db::catalog::{CatalogInputError, CategoryInput, ProductInput};
use bazaar_admin::db::coupons::CouponInput;
use bazaar_admin::db::{self, CatalogRepository, CouponRepository, RepositoryError};
use bazaar_core::coupon::CouponError;
use bazaar_core::{CategoryId, ProductId};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Missing environment variable: ADMIN_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{entry}: {source}")]
    InvalidCatalogEntry {
        entry: String,
        source: CatalogInputError,
    },

    #[error("coupon {code}: {source}")]
    InvalidCoupon { code: String, source: CouponError },

    #[error("{entry} references unknown {kind} '{slug}'")]
    UnknownReference {
        entry: String,
        kind: &'static str,
        slug: String,
    },

    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
struct SeedCatalog {
    #[serde(default)]
    categories: Vec<CategoryInput>,
    #[serde(default)]
    products: Vec<SeedProduct>,
    #[serde(default)]
    coupons: Vec<SeedCoupon>,
}

#[derive(Debug, Deserialize)]
struct SeedProduct {
    /// Category slug.
    category: Option<String>,
    #[serde(flatten)]
    input: ProductInput,
}

#[derive(Debug, Deserialize)]
struct SeedCoupon {
    /// Product slug for product-specific coupons.
    product: Option<String>,
    #[serde(flatten)]
    input: CouponInput,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SeedSummary {
    created: usize,
    skipped: usize,
}

impl SeedSummary {
    fn record<T>(
        &mut self,
        what: &str,
        result: Result<T, RepositoryError>,
    ) -> Result<Option<T>, SeedError> {
        match result {
            Ok(value) => {
                self.created += 1;
                Ok(Some(value))
            }
            Err(RepositoryError::Conflict(msg)) => {
                tracing::warn!(entry = what, "skipped: {msg}");
                self.skipped += 1;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn parse(yaml: &str) -> Result<SeedCatalog, SeedError> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Check every entry before touching the database.
fn validate(catalog: &SeedCatalog) -> Result<(), SeedError> {
    for category in &catalog.categories {
        category
            .validate()
            .map_err(|source| SeedError::InvalidCatalogEntry {
                entry: format!("category {}", category.name),
                source,
            })?;
    }
    for product in &catalog.products {
        product
            .input
            .validate()
            .map_err(|source| SeedError::InvalidCatalogEntry {
                entry: format!("product {}", product.input.name),
                source,
            })?;
    }
    for coupon in &catalog.coupons {
        coupon
            .input
            .validate()
            .map_err(|source| SeedError::InvalidCoupon {
                code: coupon.input.code.clone(),
                source,
            })?;
    }
    Ok(())
}

fn resolve<Id: Copy>(
    slugs: &HashMap<String, Id>,
    slug: Option<&str>,
    entry: &str,
    kind: &'static str,
) -> Result<Option<Id>, SeedError> {
    slug.map(|slug| {
        slugs
            .get(slug)
            .copied()
            .ok_or_else(|| SeedError::UnknownReference {
                entry: entry.to_owned(),
                kind,
                slug: slug.to_owned(),
            })
    })
    .transpose()
}

/// Load categories, products and coupons from a YAML file.
///
/// # Errors
///
/// Returns `SeedError` if the file is unreadable or invalid, a reference
/// cannot be resolved, or the database rejects an entry for any reason other
/// than it already existing.
pub async fn catalog(file: &str) -> Result<(), SeedError> {
    let yaml = std::fs::read_to_string(Path::new(file)).map_err(|source| SeedError::Io {
        path: file.to_owned(),
        source,
    })?;
    let seed = parse(&yaml)?;
    validate(&seed)?;

    let database_url = super::database_url().ok_or(SeedError::MissingDatabaseUrl)?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    let catalog_repo = CatalogRepository::new(&pool);
    let coupon_repo = CouponRepository::new(&pool);
    let mut summary = SeedSummary::default();

    for category in &seed.categories {
        let slug = category.validate().map_err(|source| SeedError::InvalidCatalogEntry {
            entry: format!("category {}", category.name),
            source,
        })?;
        summary.record(&slug, catalog_repo.create_category(category, &slug).await)?;
    }

    let categories: HashMap<String, CategoryId> = catalog_repo
        .categories()
        .await?
        .into_iter()
        .map(|c| (c.slug, c.id))
        .collect();

    for product in &seed.products {
        let mut input = product.input.clone();
        let entry = format!("product {}", input.name);
        if let Some(id) =
            resolve(&categories, product.category.as_deref(), &entry, "category")?
        {
            input.category_id = Some(id);
        }
        let slug = input.validate().map_err(|source| SeedError::InvalidCatalogEntry {
            entry: entry.clone(),
            source,
        })?;
        summary.record(&slug, catalog_repo.create_product(&input, &slug).await)?;
    }

    let products: HashMap<String, ProductId> = catalog_repo
        .products()
        .await?
        .into_iter()
        .map(|p| (p.slug, p.id))
        .collect();

    for coupon in &seed.coupons {
        let mut input = coupon.input.clone();
        let entry = format!("coupon {}", input.code);
        if let Some(id) = resolve(&products, coupon.product.as_deref(), &entry, "product")? {
            input.product_id = Some(id);
        }
        summary.record(&entry, coupon_repo.create(&input).await)?;
    }

    tracing::info!(
        created = summary.created,
        skipped = summary.skipped,
        "Catalog seed complete"
    );
    Ok(())
}
