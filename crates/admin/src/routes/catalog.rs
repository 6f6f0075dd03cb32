//! Product and category management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use bazaar_core::ProductId;
use bazaar_core::catalog::{Category, Product};

use crate::db::CatalogRepository;
use crate::db::catalog::{CategoryInput, ProductInput};
use crate::error::{AppError, Result};
use crate::middleware::RequireStoreManager;
use crate::state::AppState;

/// All products, including inactive ones.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(CatalogRepository::new(state.pool()).products().await?))
}

#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    CatalogRepository::new(state.pool())
        .product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, name = %input.name))]
pub async fn create(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse> {
    let slug = input.validate()?;
    let product = CatalogRepository::new(state.pool())
        .create_product(&input, &slug)
        .await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let slug = input.validate()?;
    let product = CatalogRepository::new(state.pool())
        .update_product(id, &input, &slug)
        .await?;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(Json(product))
}

#[instrument(skip(state, _admin))]
pub async fn categories(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(CatalogRepository::new(state.pool()).categories().await?))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, name = %input.name))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Json(input): Json<CategoryInput>,
) -> Result<impl IntoResponse> {
    let slug = input.validate()?;
    let category = CatalogRepository::new(state.pool())
        .create_category(&input, &slug)
        .await?;

    tracing::info!(category_id = %category.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}
