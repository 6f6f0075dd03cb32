//! Category and product route handlers.
//!
//! Product cards carry a price quote for whoever is asking: guests see sale
//! and list prices, signed-in customers see their tier or subscription price.
//! Wholesale price columns are never sent.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::catalog::{Category, Product, ProductFlag};
use bazaar_core::pricing::{CustomerPricing, PriceQuote, resolve_price};
use bazaar_core::{CategoryId, ProductId};

use crate::db::{CatalogRepository, CustomerRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::CurrentCustomer;
use crate::state::AppState;

/// Product listing filters.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    /// Category slug.
    pub category: Option<String>,
    pub flag: Option<ProductFlag>,
}

/// A product as shown to shoppers.
#[derive(Debug, Clone, Serialize)]
pub struct ProductCard {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub gst_rate: Decimal,
    pub in_stock: bool,
    pub is_featured: bool,
    pub is_trending: bool,
    pub is_new: bool,
    pub quote: PriceQuote,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: Product, pricing: Option<&CustomerPricing>, now: DateTime<Utc>) -> Self {
        let quote = resolve_price(&product.prices(), pricing, now);
        Self {
            id: product.id,
            category_id: product.category_id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            image_url: product.image_url,
            gst_rate: product.gst_rate,
            in_stock: product.stock > 0,
            is_featured: product.is_featured,
            is_trending: product.is_trending,
            is_new: product.is_new,
            quote,
        }
    }
}

/// Pricing terms of the signed-in customer, if any.
///
/// A session that outlived its customer row is treated as a guest.
pub(crate) async fn session_pricing(
    state: &AppState,
    customer: Option<&CurrentCustomer>,
) -> Result<Option<CustomerPricing>> {
    let Some(customer) = customer else {
        return Ok(None);
    };
    match CustomerRepository::new(state.pool()).pricing(customer.id).await {
        Ok((_, pricing)) => Ok(Some(pricing)),
        Err(RepositoryError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Products matching the listing filters.
fn filter_products(
    products: Vec<Product>,
    flag: Option<ProductFlag>,
    now: DateTime<Utc>,
) -> Vec<Product> {
    match flag {
        Some(flag) => products
            .into_iter()
            .filter(|p| p.has_flag(flag, now))
            .collect(),
        None => products,
    }
}

#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.categories().await?;
    Ok(Json(categories.as_ref().clone()))
}

#[instrument(skip(state, customer))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductCard>>> {
    let now = Utc::now();
    let pricing = session_pricing(&state, customer.as_ref()).await?;
    let products = CatalogRepository::new(state.pool())
        .products(query.category.as_deref())
        .await?;

    let cards = filter_products(products, query.flag, now)
        .into_iter()
        .map(|p| ProductCard::new(p, pricing.as_ref(), now))
        .collect();
    Ok(Json(cards))
}

#[instrument(skip(state, customer))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<Json<ProductCard>> {
    let now = Utc::now();
    let product = CatalogRepository::new(state.pool())
        .product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;
    let pricing = session_pricing(&state, customer.as_ref()).await?;
    Ok(Json(ProductCard::new(product, pricing.as_ref(), now)))
}
