//! Customer price resolution.
//!
//! A product's price for a given customer is resolved in three steps:
//!
//! 1. **Base selling price** - the sale price while a sale is running, else the
//!    list price.
//! 2. **Tier price** - retailers, self-employed traders and distributors buy
//!    from their own price list when it beats the base selling price.
//! 3. **Subscription discount** - subscription customers get a standing
//!    percentage or fixed discount. A per-category override replaces the
//!    customer-level terms for products in that category. Sale-priced items
//!    use the separate sale discount value and get nothing when it is unset.
//!
//! All prices are GST-inclusive.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::{
    CategoryId, CustomerType, DeliverySchedule, DiscountType, ProductId, percent_of, round_money,
    within_window,
};

/// The price fields of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPrices {
    pub product_id: ProductId,
    pub category_id: Option<CategoryId>,
    /// List price (MRP).
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub sale_starts_at: Option<DateTime<Utc>>,
    pub sale_ends_at: Option<DateTime<Utc>>,
    pub retailer_price: Option<Decimal>,
    pub distributor_price: Option<Decimal>,
}

impl ProductPrices {
    /// A product is on sale when it has a sale price strictly below its list
    /// price and `now` falls inside the (optional) sale window.
    #[must_use]
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        let Some(sale_price) = self.sale_price else {
            return false;
        };
        sale_price < self.price
            && within_window(self.sale_starts_at, self.sale_ends_at, now)
    }

    /// The price before any customer-specific adjustment.
    #[must_use]
    pub fn selling_price(&self, now: DateTime<Utc>) -> Decimal {
        match self.sale_price {
            Some(sale_price) if self.is_on_sale(now) => sale_price,
            _ => self.price,
        }
    }

    /// The tier list price for a customer type, if that tier has one.
    #[must_use]
    pub fn tier_price(&self, customer_type: CustomerType) -> Option<(Decimal, DiscountSource)> {
        match customer_type {
            CustomerType::Retailer | CustomerType::SelfEmployed => self
                .retailer_price
                .map(|price| (price, DiscountSource::RetailerTier)),
            CustomerType::Distributor => self
                .distributor_price
                .or(self.retailer_price)
                .map(|price| (price, DiscountSource::DistributorTier)),
            CustomerType::Regular | CustomerType::Subscription => None,
        }
    }
}

/// Customer-level subscription terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTerms {
    pub discount_type: DiscountType,
    /// Discount on regular-priced items.
    pub discount_value: Decimal,
    /// Discount on sale-priced items; `None` means no extra discount on sales.
    pub sale_discount_value: Option<Decimal>,
    pub delivery_fee: Option<Decimal>,
    pub delivery_schedule: Option<DeliverySchedule>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl SubscriptionTerms {
    /// Whether `now` falls inside the subscription validity window.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        within_window(self.starts_at, self.ends_at, now)
    }
}

/// A per-category override of the customer-level subscription discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct CategoryDiscount {
    pub category_id: CategoryId,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub sale_discount_value: Option<Decimal>,
}

/// Everything about a customer that affects the prices they see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CustomerPricing {
    pub customer_type: CustomerType,
    pub subscription: Option<SubscriptionTerms>,
    pub category_discounts: Vec<CategoryDiscount>,
}

impl CustomerPricing {
    /// Subscription terms that apply right now, if any.
    #[must_use]
    pub fn active_subscription(&self, now: DateTime<Utc>) -> Option<&SubscriptionTerms> {
        if self.customer_type != CustomerType::Subscription {
            return None;
        }
        self.subscription.as_ref().filter(|terms| terms.is_active(now))
    }

    /// The discount that applies to a product: `(type, value, source)`.
    fn subscription_discount(
        &self,
        category_id: Option<CategoryId>,
        on_sale: bool,
        now: DateTime<Utc>,
    ) -> Option<(DiscountType, Decimal, DiscountSource)> {
        let terms = self.active_subscription(now)?;

        let category_override = category_id.and_then(|category| {
            self.category_discounts
                .iter()
                .find(|discount| discount.category_id == category)
        });

        let (discount_type, regular, sale, source) = match category_override {
            Some(discount) => (
                discount.discount_type,
                discount.discount_value,
                discount.sale_discount_value,
                DiscountSource::SubscriptionCategory,
            ),
            None => (
                terms.discount_type,
                terms.discount_value,
                terms.sale_discount_value,
                DiscountSource::Subscription,
            ),
        };

        let value = if on_sale { sale? } else { regular };
        (value > Decimal::ZERO).then_some((discount_type, value, source))
    }
}

/// Why a customer pays less than list price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountSource {
    #[default]
    None,
    Sale,
    RetailerTier,
    DistributorTier,
    Subscription,
    SubscriptionCategory,
}

/// A resolved price for one unit of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub product_id: ProductId,
    pub list_price: Decimal,
    pub unit_price: Decimal,
    pub on_sale: bool,
    pub source: DiscountSource,
    pub savings: Decimal,
    /// Whole percent saved against list price, as shown on product cards.
    pub savings_percent: Decimal,
}

/// Amount taken off `amount` by a discount, never more than `amount`.
#[must_use]
pub fn discount_amount(amount: Decimal, discount_type: DiscountType, value: Decimal) -> Decimal {
    let amount = amount.max(Decimal::ZERO);
    let off = match discount_type {
        DiscountType::Percentage => percent_of(amount, value),
        DiscountType::Fixed => round_money(value.max(Decimal::ZERO)),
    };
    off.min(amount)
}

/// Whole percent that `savings` represents of `list_price`.
#[must_use]
pub fn savings_percent(list_price: Decimal, savings: Decimal) -> Decimal {
    if list_price <= Decimal::ZERO || savings <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (savings * Decimal::ONE_HUNDRED / list_price)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Resolve the unit price of a product for an optional signed-in customer.
#[must_use]
pub fn resolve_price(
    product: &ProductPrices,
    customer: Option<&CustomerPricing>,
    now: DateTime<Utc>,
) -> PriceQuote {
    let on_sale = product.is_on_sale(now);
    let mut unit_price = product.selling_price(now);
    let mut source = if on_sale {
        DiscountSource::Sale
    } else {
        DiscountSource::None
    };

    if let Some(customer) = customer {
        if let Some((tier_price, tier_source)) = product.tier_price(customer.customer_type)
            && tier_price < unit_price
        {
            unit_price = tier_price;
            source = tier_source;
        }

        if let Some((discount_type, value, discount_source)) =
            customer.subscription_discount(product.category_id, on_sale, now)
        {
            unit_price -= discount_amount(unit_price, discount_type, value);
            source = discount_source;
        }
    }

    let unit_price = round_money(unit_price);
    let savings = round_money(product.price - unit_price).max(Decimal::ZERO);

    PriceQuote {
        product_id: product.product_id,
        list_price: product.price,
        unit_price,
        on_sale,
        source,
        savings,
        savings_percent: savings_percent(product.price, savings),
    }
}
