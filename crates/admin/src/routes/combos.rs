//! Combo offer management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use bazaar_core::ComboId;
use bazaar_core::catalog::Product;
use bazaar_core::combo::{self, ComboOffer, original_price};

use crate::db::catalog::{combo_components, offer_components};
use crate::db::combos::ComboInput;
use crate::db::{CatalogRepository, ComboRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireStoreManager;
use crate::state::AppState;

/// A combo with its pricing against current list prices.
#[derive(Debug, Serialize)]
pub struct ComboView {
    #[serde(flatten)]
    pub offer: ComboOffer,
    pub original_price: Decimal,
    pub savings: Decimal,
    pub live: bool,
}

impl ComboView {
    #[must_use]
    pub fn new(offer: ComboOffer, products: &[Product], now: DateTime<Utc>) -> Self {
        let components = offer_components(&offer, products);
        Self {
            original_price: original_price(&components),
            savings: offer.savings(&components),
            live: offer.is_live(now),
            offer,
        }
    }
}

#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
) -> Result<Json<Vec<ComboView>>> {
    let combos = ComboRepository::new(state.pool()).list().await?;
    let products = CatalogRepository::new(state.pool()).products().await?;
    let now = Utc::now();

    Ok(Json(
        combos
            .into_iter()
            .map(|offer| ComboView::new(offer, &products, now))
            .collect(),
    ))
}

/// Create a combo from at least two active products, priced below the sum
/// of their list prices.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, name = %input.name))]
pub async fn create(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Json(input): Json<ComboInput>,
) -> Result<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("combo name must not be empty".to_string()));
    }
    if let (Some(start), Some(end)) = (input.starts_at, input.ends_at)
        && end <= start
    {
        return Err(AppError::BadRequest(
            "combo must end after it starts".to_string(),
        ));
    }

    let products = CatalogRepository::new(state.pool())
        .active_products_by_ids(&input.product_ids)
        .await?;
    let components = combo_components(&input.product_ids, &products);
    combo::validate(&input.product_ids, input.combo_price, &components)?;

    let offer = ComboRepository::new(state.pool()).create(&input).await?;
    tracing::info!(combo_id = %offer.id, combo_price = %offer.combo_price, "Combo created");

    Ok((
        StatusCode::CREATED,
        Json(ComboView::new(offer, &products, Utc::now())),
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn deactivate(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path(id): Path<ComboId>,
) -> Result<Json<ComboOffer>> {
    let offer = ComboRepository::new(state.pool()).deactivate(id).await?;
    tracing::info!(combo_id = %offer.id, "Combo deactivated");
    Ok(Json(offer))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use bazaar_core::{CategoryId, ProductId};

    use super::*;

    fn product(id: i32, price: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: Some(CategoryId::new(2)),
            name: format!("Snack {id}"),
            slug: format!("snack-{id}"),
            description: None,
            image_url: None,
            price,
            sale_price: None,
            sale_starts_at: None,
            sale_ends_at: None,
            retailer_price: None,
            distributor_price: None,
            stock: 10,
            gst_rate: dec!(12),
            hsn_code: None,
            is_featured: false,
            is_trending: false,
            is_new: false,
            active: true,
        }
    }

    #[test]
    fn test_view_prices_against_list_prices() {
        let offer = ComboOffer {
            id: ComboId::new(3),
            name: "Party Pack".to_string(),
            description: None,
            product_ids: vec![ProductId::new(1), ProductId::new(2)],
            combo_price: dec!(150),
            display_position: 1,
            active: false,
            starts_at: None,
            ends_at: None,
        };
        let view = ComboView::new(
            offer,
            &[product(1, dec!(100)), product(2, dec!(90))],
            Utc::now(),
        );
        assert_eq!(view.original_price, dec!(190));
        assert_eq!(view.savings, dec!(40));
        assert!(!view.live);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Party Pack");
        assert_eq!(json["savings"], "40");
    }
}
