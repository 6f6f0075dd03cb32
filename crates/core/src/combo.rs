//! Combo offers: fixed product bundles sold at a flat price.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartLine;
use crate::pricing::savings_percent;
use crate::types::{ComboId, ProductId, allocate_proportionally, round_money, within_window};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComboError {
    #[error("a combo needs at least two distinct products")]
    TooFewProducts,
    #[error("product {0} appears more than once")]
    DuplicateProduct(ProductId),
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),
    #[error("combo price must be greater than zero")]
    NonPositivePrice,
    #[error("combo price {combo_price} must be below the original price {original_price}")]
    NotCheaper {
        combo_price: Decimal,
        original_price: Decimal,
    },
}

/// A bundle definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ComboOffer {
    pub id: ComboId,
    pub name: String,
    pub description: Option<String>,
    pub product_ids: Vec<ProductId>,
    pub combo_price: Decimal,
    pub display_position: i32,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Product data needed to validate and price a combo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboComponent {
    pub product_id: ProductId,
    pub name: String,
    pub list_price: Decimal,
    pub gst_rate: Decimal,
    pub hsn_code: Option<String>,
}

/// What the storefront shows for a live combo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComboSummary {
    pub id: ComboId,
    pub name: String,
    pub description: Option<String>,
    pub products: Vec<ComboComponent>,
    pub original_price: Decimal,
    pub combo_price: Decimal,
    pub savings: Decimal,
    pub savings_percent: Decimal,
}

/// Sum of constituent list prices.
#[must_use]
pub fn original_price(components: &[ComboComponent]) -> Decimal {
    components.iter().map(|c| c.list_price).sum()
}

/// Check a bundle definition against the products it names.
///
/// `components` holds whichever of `product_ids` were found in the catalog.
///
/// # Errors
///
/// Returns `ComboError::DuplicateProduct` for a repeated id,
/// `ComboError::TooFewProducts` for fewer than two distinct products,
/// `ComboError::UnknownProduct` for an id missing from `components`,
/// `ComboError::NonPositivePrice` for a zero or negative price and
/// `ComboError::NotCheaper` when the bundle costs at least its parts.
pub fn validate(
    product_ids: &[ProductId],
    combo_price: Decimal,
    components: &[ComboComponent],
) -> Result<(), ComboError> {
    let mut seen = HashSet::with_capacity(product_ids.len());
    for id in product_ids {
        if !seen.insert(*id) {
            return Err(ComboError::DuplicateProduct(*id));
        }
    }
    if seen.len() < 2 {
        return Err(ComboError::TooFewProducts);
    }
    if let Some(missing) = product_ids
        .iter()
        .find(|id| !components.iter().any(|c| c.product_id == **id))
    {
        return Err(ComboError::UnknownProduct(*missing));
    }
    if combo_price <= Decimal::ZERO {
        return Err(ComboError::NonPositivePrice);
    }
    let original_price = original_price(components);
    if combo_price >= original_price {
        return Err(ComboError::NotCheaper {
            combo_price,
            original_price,
        });
    }
    Ok(())
}

impl ComboOffer {
    /// Validate this combo against catalog data.
    ///
    /// # Errors
    ///
    /// Same as the free [`validate`] function.
    pub fn validate(&self, components: &[ComboComponent]) -> Result<(), ComboError> {
        validate(&self.product_ids, self.combo_price, components)
    }

    /// Active and inside its optional window.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && within_window(self.starts_at, self.ends_at, now)
    }

    #[must_use]
    pub fn savings(&self, components: &[ComboComponent]) -> Decimal {
        (original_price(components) - self.combo_price).max(Decimal::ZERO)
    }

    /// Components in the combo's declared product order.
    fn ordered<'c>(&self, components: &'c [ComboComponent]) -> Vec<&'c ComboComponent> {
        self.product_ids
            .iter()
            .filter_map(|id| components.iter().find(|c| c.product_id == *id))
            .collect()
    }

    /// Split the combo price over its products in proportion to their list
    /// prices, producing one cart line per product.
    ///
    /// Each line keeps the product's own GST rate; the last line absorbs the
    /// rounding remainder so the lines sum to `combo_price * quantity`.
    #[must_use]
    pub fn allocate(&self, components: &[ComboComponent], quantity: u32) -> Vec<CartLine> {
        let ordered = self.ordered(components);
        let weights: Vec<Decimal> = ordered.iter().map(|c| c.list_price).collect();
        let shares = allocate_proportionally(round_money(self.combo_price), &weights);

        ordered
            .into_iter()
            .zip(shares)
            .map(|(component, share)| CartLine {
                product_id: component.product_id,
                combo_id: Some(self.id),
                name: format!("{} ({})", component.name, self.name),
                hsn_code: component.hsn_code.clone(),
                list_price: component.list_price,
                unit_price: share,
                quantity,
                gst_rate: component.gst_rate,
            })
            .collect()
    }

    #[must_use]
    pub fn summary(&self, components: &[ComboComponent]) -> ComboSummary {
        let original_price = original_price(components);
        let savings = self.savings(components);
        ComboSummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            products: self.ordered(components).into_iter().cloned().collect(),
            original_price,
            combo_price: self.combo_price,
            savings,
            savings_percent: savings_percent(original_price, savings),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::cart::{Adjustments, CartTotals};

    fn component(id: i32, price: Decimal, rate: Decimal) -> ComboComponent {
        ComboComponent {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            list_price: price,
            gst_rate: rate,
            hsn_code: None,
        }
    }

    fn combo(ids: &[i32], price: Decimal) -> ComboOffer {
        ComboOffer {
            id: ComboId::new(7),
            name: "Breakfast Box".to_string(),
            description: None,
            product_ids: ids.iter().copied().map(ProductId::new).collect(),
            combo_price: price,
            display_position: 0,
            active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    fn catalog() -> Vec<ComboComponent> {
        vec![
            component(1, dec!(60), dec!(5)),
            component(2, dec!(40), dec!(18)),
            component(3, dec!(100), dec!(12)),
        ]
    }

    #[test]
    fn test_validate_accepts_cheaper_bundle() {
        let offer = combo(&[1, 2], dec!(90));
        assert!(offer.validate(&catalog()[..2]).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_bundles() {
        let products = catalog();
        assert_eq!(
            combo(&[1], dec!(50)).validate(&products),
            Err(ComboError::TooFewProducts)
        );
        assert_eq!(
            combo(&[1, 1], dec!(50)).validate(&products),
            Err(ComboError::DuplicateProduct(ProductId::new(1)))
        );
        assert_eq!(
            combo(&[1, 9], dec!(50)).validate(&products),
            Err(ComboError::UnknownProduct(ProductId::new(9)))
        );
        assert_eq!(
            combo(&[1, 2], dec!(0)).validate(&products[..2]),
            Err(ComboError::NonPositivePrice)
        );
        assert!(matches!(
            combo(&[1, 2], dec!(100)).validate(&products[..2]),
            Err(ComboError::NotCheaper { .. })
        ));
    }

    #[test]
    fn test_summary_savings() {
        let products = &catalog()[..2];
        let summary = combo(&[1, 2], dec!(90)).summary(products);
        assert_eq!(summary.original_price, dec!(100));
        assert_eq!(summary.savings, dec!(10));
        assert_eq!(summary.savings_percent, dec!(10));
    }

    #[test]
    fn test_allocate_proportional_with_remainder() {
        let offer = combo(&[1, 2, 3], dec!(99.99));
        let lines = offer.allocate(&catalog(), 2);
        let prices: Vec<Decimal> = lines.iter().map(|l| l.unit_price).collect();
        // 60/200, 40/200, remainder.
        assert_eq!(prices, vec![dec!(30.00), dec!(20.00), dec!(49.99)]);
        assert!(lines.iter().all(|l| l.combo_id == Some(ComboId::new(7))));
        assert!(lines.iter().all(|l| l.quantity == 2));
        assert_eq!(lines.get(1).unwrap().gst_rate, dec!(18));
    }

    #[test]
    fn test_allocated_lines_total_the_combo_price() {
        let offer = combo(&[1, 2, 3], dec!(150));
        let totals = CartTotals::compute(offer.allocate(&catalog(), 1), &Adjustments::default())
            .unwrap();
        assert_eq!(totals.subtotal, dec!(150));
        assert_eq!(totals.taxable_total + totals.gst_total, dec!(150));
    }

    #[test]
    fn test_is_live_window() {
        let now = Utc::now();
        let mut offer = combo(&[1, 2], dec!(90));
        offer.starts_at = Some(now + chrono::Duration::days(1));
        assert!(!offer.is_live(now));
        offer.starts_at = Some(now - chrono::Duration::days(1));
        assert!(offer.is_live(now));
    }
}
