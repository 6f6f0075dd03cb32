//! Combo offer listing.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use tracing::instrument;

use bazaar_core::ProductId;
use bazaar_core::catalog::Product;
use bazaar_core::combo::{ComboOffer, ComboSummary};

use crate::db::CatalogRepository;
use crate::db::catalog::combo_components;
use crate::error::Result;
use crate::state::AppState;

/// Summaries of combos that are live and whose products are all still sold.
fn live_summaries(
    combos: &[ComboOffer],
    products: &[Product],
    now: DateTime<Utc>,
) -> Vec<ComboSummary> {
    combos
        .iter()
        .filter(|combo| combo.is_live(now))
        .filter_map(|combo| {
            let components = combo_components(combo, products);
            (components.len() == combo.product_ids.len()).then(|| combo.summary(&components))
        })
        .collect()
}

#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ComboSummary>>> {
    let catalog = CatalogRepository::new(state.pool());
    let combos = catalog.combos().await?;

    let mut ids: Vec<ProductId> = combos
        .iter()
        .flat_map(|c| c.product_ids.iter().copied())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    let products = catalog.products_by_ids(&ids).await?;

    Ok(Json(live_summaries(&combos, &products, Utc::now())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use bazaar_core::ComboId;

    use super::*;

    fn product(id: i32, price: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: None,
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: None,
            image_url: None,
            price,
            sale_price: None,
            sale_starts_at: None,
            sale_ends_at: None,
            retailer_price: None,
            distributor_price: None,
            stock: 10,
            gst_rate: dec!(5),
            hsn_code: None,
            is_featured: false,
            is_trending: false,
            is_new: false,
            active: true,
        }
    }

    fn combo(id: i32, product_ids: &[i32], price: Decimal) -> ComboOffer {
        ComboOffer {
            id: ComboId::new(id),
            name: format!("Combo {id}"),
            description: None,
            product_ids: product_ids.iter().map(|p| ProductId::new(*p)).collect(),
            combo_price: price,
            display_position: id,
            active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn test_only_live_complete_combos() {
        let now = Utc::now();
        let products = vec![product(1, dec!(300)), product(2, dec!(200))];
        let mut ended = combo(3, &[1, 2], dec!(400));
        ended.ends_at = Some(now - Duration::days(1));

        let summaries = live_summaries(
            &[
                combo(1, &[1, 2], dec!(450)),
                combo(2, &[1, 9], dec!(250)),
                ended,
            ],
            &products,
            now,
        );
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].original_price, dec!(500));
        assert_eq!(summaries[0].savings, dec!(50));
        assert_eq!(summaries[0].savings_percent, dec!(10));
    }
}
