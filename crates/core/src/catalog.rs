//! Catalog and customer records shared by the storefront, admin and CLI.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::{CategoryDiscount, CustomerPricing, ProductPrices, SubscriptionTerms};
use crate::types::{
    CategoryId, CustomerType, DeliverySchedule, DiscountType, Email, ProductId, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub position: i32,
}

/// A product as stored. Prices are GST-inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub sale_starts_at: Option<DateTime<Utc>>,
    pub sale_ends_at: Option<DateTime<Utc>>,
    pub retailer_price: Option<Decimal>,
    pub distributor_price: Option<Decimal>,
    pub stock: i32,
    pub gst_rate: Decimal,
    pub hsn_code: Option<String>,
    pub is_featured: bool,
    pub is_trending: bool,
    pub is_new: bool,
    pub active: bool,
}

impl Product {
    #[must_use]
    pub fn prices(&self) -> ProductPrices {
        ProductPrices {
            product_id: self.id,
            category_id: self.category_id,
            price: self.price,
            sale_price: self.sale_price,
            sale_starts_at: self.sale_starts_at,
            sale_ends_at: self.sale_ends_at,
            retailer_price: self.retailer_price,
            distributor_price: self.distributor_price,
        }
    }

    #[must_use]
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        self.prices().is_on_sale(now)
    }

    /// Whether the product carries a merchandising flag.
    #[must_use]
    pub fn has_flag(&self, flag: ProductFlag, now: DateTime<Utc>) -> bool {
        match flag {
            ProductFlag::Featured => self.is_featured,
            ProductFlag::Trending => self.is_trending,
            ProductFlag::New => self.is_new,
            ProductFlag::OnSale => self.is_on_sale(now),
        }
    }
}

/// Merchandising flags used to filter product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFlag {
    Featured,
    Trending,
    New,
    OnSale,
}

/// Derive a URL slug from a display name: lowercase ASCII words joined by dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// A storefront customer, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub state_code: Option<String>,
    pub gstin: Option<String>,
    pub customer_type: CustomerType,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub sale_discount_value: Option<Decimal>,
    pub delivery_fee: Option<Decimal>,
    pub delivery_schedule: Option<DeliverySchedule>,
    pub subscription_starts_at: Option<DateTime<Utc>>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Subscription terms, for subscription customers only.
    #[must_use]
    pub fn subscription_terms(&self) -> Option<SubscriptionTerms> {
        (self.customer_type == CustomerType::Subscription).then(|| SubscriptionTerms {
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            sale_discount_value: self.sale_discount_value,
            delivery_fee: self.delivery_fee,
            delivery_schedule: self.delivery_schedule,
            starts_at: self.subscription_starts_at,
            ends_at: self.subscription_ends_at,
        })
    }

    #[must_use]
    pub fn pricing(&self, category_discounts: Vec<CategoryDiscount>) -> CustomerPricing {
        CustomerPricing {
            customer_type: self.customer_type,
            subscription: self.subscription_terms(),
            category_discounts,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            category_id: Some(CategoryId::new(2)),
            name: "Toor Dal 1kg".to_string(),
            slug: "toor-dal-1kg".to_string(),
            description: None,
            image_url: None,
            price: dec!(180),
            sale_price: Some(dec!(160)),
            sale_starts_at: None,
            sale_ends_at: None,
            retailer_price: None,
            distributor_price: None,
            stock: 10,
            gst_rate: dec!(5),
            hsn_code: Some("0713".to_string()),
            is_featured: true,
            is_trending: false,
            is_new: false,
            active: true,
        }
    }

    fn customer(customer_type: CustomerType) -> Customer {
        Customer {
            id: UserId::new(1),
            email: Email::parse("asha@example.in").unwrap(),
            name: "Asha".to_string(),
            phone: None,
            address: None,
            state_code: Some("27".to_string()),
            gstin: None,
            customer_type,
            discount_type: DiscountType::Percentage,
            discount_value: dec!(10),
            sale_discount_value: None,
            delivery_fee: Some(dec!(20)),
            delivery_schedule: Some(DeliverySchedule::Daily),
            subscription_starts_at: None,
            subscription_ends_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_flags() {
        let now = Utc::now();
        let mut p = product();
        assert!(p.has_flag(ProductFlag::Featured, now));
        assert!(p.has_flag(ProductFlag::OnSale, now));
        p.sale_ends_at = Some(now - Duration::days(1));
        assert!(!p.has_flag(ProductFlag::OnSale, now));
        assert!(!p.has_flag(ProductFlag::Trending, now));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Toor Dal 1kg"), "toor-dal-1kg");
        assert_eq!(slugify("  Ghee (Desi) -- 500ml "), "ghee-desi-500ml");
        assert_eq!(slugify("₹ Offers"), "offers");
    }

    #[test]
    fn test_subscription_terms_only_for_subscribers() {
        assert!(customer(CustomerType::Regular).subscription_terms().is_none());
        let terms = customer(CustomerType::Subscription)
            .subscription_terms()
            .unwrap();
        assert_eq!(terms.discount_value, dec!(10));
        assert_eq!(terms.delivery_fee, Some(dec!(20)));
    }

    #[test]
    fn test_pricing_carries_category_discounts() {
        let pricing = customer(CustomerType::Subscription).pricing(vec![CategoryDiscount {
            category_id: CategoryId::new(2),
            discount_type: DiscountType::Fixed,
            discount_value: dec!(5),
            sale_discount_value: None,
        }]);
        assert_eq!(pricing.category_discounts.len(), 1);
        assert!(pricing.active_subscription(Utc::now()).is_some());
    }
}
