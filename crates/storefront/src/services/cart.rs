//! Cart pricing and checkout.
//!
//! The session cart holds ids and quantities only. Every view of the cart and
//! every checkout re-reads products, combos and the customer's pricing terms,
//! then runs the shared pricing and totals rules.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::cart::{
    Adjustments, CartError, CartLine, CartTotals, DeliveryPolicy, delivery_fee_for,
    ensure_not_empty,
};
use bazaar_core::catalog::{Customer, Product};
use bazaar_core::combo::ComboOffer;
use bazaar_core::coupon::{Coupon, CouponDiscount, CouponError, CouponLine, normalize_code};
use bazaar_core::order::{BuyerDetails, NewOrder};
use bazaar_core::pricing::{CustomerPricing, resolve_price};
use bazaar_core::{Gstin, OrderChannel, OrderId, PaymentType, ProductId, UserId};

use crate::db::catalog::combo_components;
use crate::db::orders::PlaceOrderError;
use crate::db::{CatalogRepository, CustomerRepository, OrderRepository, RepositoryError};
use crate::models::{CartItemRef, SessionCart};

/// Errors raised while pricing or checking out a cart.
#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error("coupon {0} does not exist")]
    UnknownCoupon(String),
    #[error("some items in the cart are no longer available")]
    Unavailable,
    #[error("a shipping address is required")]
    MissingAddress,
    #[error(transparent)]
    PlaceOrder(#[from] PlaceOrderError),
}

/// A cart with current prices and totals.
#[derive(Debug, Clone, Serialize)]
pub struct PricedCart {
    pub totals: CartTotals,
    pub coupon: Option<CouponDiscount>,
    /// Why the stored coupon code was not applied.
    pub coupon_error: Option<String>,
    /// Items that are no longer sold and were left out of the totals.
    pub unavailable: Vec<CartItemRef>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub totals: CartTotals,
}

/// Cart lines built from current catalog data.
#[derive(Debug, Default)]
struct BuiltLines {
    lines: Vec<CartLine>,
    unavailable: Vec<CartItemRef>,
}

/// Prices session carts and places online orders.
pub struct CartService<'a> {
    pool: &'a PgPool,
    delivery: &'a DeliveryPolicy,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, delivery: &'a DeliveryPolicy) -> Self {
        Self { pool, delivery }
    }

    /// Price a cart for display.
    ///
    /// A stored coupon that no longer applies is reported in
    /// `coupon_error` rather than failing the whole cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` for database failures.
    pub async fn price(
        &self,
        cart: &SessionCart,
        customer: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<PricedCart, CartServiceError> {
        let pricing = self.customer_pricing(customer).await?;
        let built = self.build(cart, pricing.as_ref().map(|(_, p)| p), now).await?;
        let coupon = self.stored_coupon(cart).await?;
        let mut priced = total_cart(
            built,
            coupon.clone(),
            false,
            pricing.as_ref().map(|(_, p)| p),
            self.delivery,
            now,
        )?;
        if coupon.is_none()
            && let Some(code) = cart.coupon_code.as_deref()
        {
            priced.coupon_error =
                Some(CartServiceError::UnknownCoupon(normalize_code(code)).to_string());
        }
        Ok(priced)
    }

    /// Check that `code` can be applied to the cart as it stands.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::UnknownCoupon` or the `CouponError` that
    /// prevents redemption.
    pub async fn check_coupon(
        &self,
        cart: &SessionCart,
        customer: Option<UserId>,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<CouponDiscount, CartServiceError> {
        let code = normalize_code(code);
        let coupon = CatalogRepository::new(self.pool)
            .coupon_by_code(&code)
            .await?
            .ok_or_else(|| CartServiceError::UnknownCoupon(code.clone()))?;

        let pricing = self.customer_pricing(customer).await?;
        let built = self.build(cart, pricing.as_ref().map(|(_, p)| p), now).await?;
        let (coupon_lines, subtotal) = coupon_basis(&built.lines);
        Ok(coupon.evaluate(&coupon_lines, subtotal, now)?)
    }

    /// Re-price the cart and write an online order.
    ///
    /// # Errors
    ///
    /// Fails on an empty cart, unavailable items, a coupon that no longer
    /// applies, a missing shipping address or insufficient stock.
    pub async fn checkout(
        &self,
        cart: &SessionCart,
        customer_id: UserId,
        shipping_address: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, CartServiceError> {
        let (customer, pricing) = CustomerRepository::new(self.pool).pricing(customer_id).await?;
        let built = self.build(cart, Some(&pricing), now).await?;
        if !built.unavailable.is_empty() {
            return Err(CartServiceError::Unavailable);
        }
        ensure_not_empty(&built.lines)?;

        let coupon = self.stored_coupon(cart).await?;
        if coupon.is_none()
            && let Some(code) = cart.coupon_code.as_deref()
        {
            return Err(CartServiceError::UnknownCoupon(normalize_code(code)));
        }
        let coupon_id = coupon.as_ref().map(|c| c.id);
        let priced = total_cart(built, coupon, true, Some(&pricing), self.delivery, now)?;

        let buyer = buyer_details(&customer, shipping_address)?;
        let order = NewOrder::from_totals(
            OrderChannel::Online,
            &priced.totals,
            buyer,
            Some(PaymentType::Online),
            priced.coupon.as_ref().map(|c| c.code.clone()),
        );
        let order_id = OrderRepository::new(self.pool)
            .place(&order, coupon_id)
            .await?;

        tracing::info!(
            order_id = %order_id,
            customer_id = %customer_id,
            payable = %priced.totals.payable,
            "Online order placed"
        );

        Ok(PlacedOrder {
            order_id,
            totals: priced.totals,
        })
    }

    async fn customer_pricing(
        &self,
        customer: Option<UserId>,
    ) -> Result<Option<(Customer, CustomerPricing)>, CartServiceError> {
        match customer {
            Some(id) => Ok(Some(CustomerRepository::new(self.pool).pricing(id).await?)),
            None => Ok(None),
        }
    }

    /// The coupon stored in the session, if it still exists.
    async fn stored_coupon(&self, cart: &SessionCart) -> Result<Option<Coupon>, RepositoryError> {
        match cart.coupon_code.as_deref() {
            Some(code) => {
                CatalogRepository::new(self.pool)
                    .coupon_by_code(&normalize_code(code))
                    .await
            }
            None => Ok(None),
        }
    }

    async fn build(
        &self,
        cart: &SessionCart,
        pricing: Option<&CustomerPricing>,
        now: DateTime<Utc>,
    ) -> Result<BuiltLines, CartServiceError> {
        let catalog = CatalogRepository::new(self.pool);
        let combos = catalog.combos_by_ids(&cart.combo_ids()).await?;

        let products = catalog
            .products_by_ids(&referenced_products(cart, &combos))
            .await?;

        Ok(build_lines(cart, &products, &combos, pricing, now))
    }
}

/// Turn session items into priced cart lines.
fn build_lines(
    cart: &SessionCart,
    products: &[Product],
    combos: &[ComboOffer],
    pricing: Option<&CustomerPricing>,
    now: DateTime<Utc>,
) -> BuiltLines {
    let mut built = BuiltLines::default();
    for entry in &cart.items {
        match entry.item {
            CartItemRef::Product { product_id } => {
                let Some(product) = products.iter().find(|p| p.id == product_id) else {
                    built.unavailable.push(entry.item);
                    continue;
                };
                let quote = resolve_price(&product.prices(), pricing, now);
                built.lines.push(CartLine {
                    product_id,
                    combo_id: None,
                    name: product.name.clone(),
                    hsn_code: product.hsn_code.clone(),
                    list_price: quote.list_price,
                    unit_price: quote.unit_price,
                    quantity: entry.quantity,
                    gst_rate: product.gst_rate,
                });
            }
            CartItemRef::Combo { combo_id } => {
                let combo = combos
                    .iter()
                    .find(|c| c.id == combo_id && c.is_live(now));
                let components = combo.map(|c| combo_components(c, products));
                match (combo, components) {
                    (Some(combo), Some(components))
                        if components.len() == combo.product_ids.len() =>
                    {
                        built
                            .lines
                            .extend(combo.allocate(&components, entry.quantity));
                    }
                    _ => built.unavailable.push(entry.item),
                }
            }
        }
    }
    built
}

/// Standalone product lines and the cart subtotal, as coupons see them.
fn coupon_basis(lines: &[CartLine]) -> (Vec<CouponLine>, rust_decimal::Decimal) {
    let coupon_lines = lines
        .iter()
        .filter(|line| line.combo_id.is_none())
        .map(|line| CouponLine {
            product_id: line.product_id,
            quantity: line.quantity,
            line_total: line.gross(),
        })
        .collect();
    let subtotal = lines.iter().map(CartLine::gross).sum();
    (coupon_lines, subtotal)
}

/// Apply the coupon and delivery fee and total the cart.
///
/// With `strict`, a coupon that cannot be redeemed is an error; otherwise it
/// is reported and left out.
fn total_cart(
    built: BuiltLines,
    coupon: Option<Coupon>,
    strict: bool,
    pricing: Option<&CustomerPricing>,
    delivery: &DeliveryPolicy,
    now: DateTime<Utc>,
) -> Result<PricedCart, CartServiceError> {
    let (coupon_lines, subtotal) = coupon_basis(&built.lines);

    let mut coupon_error = None;
    let discount = match coupon.map(|c| c.evaluate(&coupon_lines, subtotal, now)) {
        None => None,
        Some(Ok(discount)) => Some(discount),
        Some(Err(e)) if strict => return Err(e.into()),
        Some(Err(e)) => {
            coupon_error = Some(e.to_string());
            None
        }
    };

    let mut adjustments = Adjustments {
        coupon_discount: discount.as_ref().map(|d| d.amount).unwrap_or_default(),
        coupon_scope: discount.as_ref().and_then(CouponDiscount::scope),
        ..Adjustments::default()
    };
    let without_delivery = CartTotals::compute(built.lines.clone(), &adjustments)?;
    if built.lines.is_empty() {
        return Ok(PricedCart {
            totals: without_delivery,
            coupon: discount,
            coupon_error,
            unavailable: built.unavailable,
        });
    }

    adjustments.delivery_fee = delivery_fee_for(
        OrderChannel::Online,
        pricing,
        without_delivery.net_merchandise(),
        delivery,
        now,
    );
    let totals = CartTotals::compute(built.lines, &adjustments)?;

    Ok(PricedCart {
        totals,
        coupon: discount,
        coupon_error,
        unavailable: built.unavailable,
    })
}

/// Buyer block for an online order; the request's address wins over the
/// one on file.
fn buyer_details(
    customer: &Customer,
    shipping_address: Option<String>,
) -> Result<BuyerDetails, CartServiceError> {
    let shipping_address = shipping_address
        .map(|a| a.trim().to_owned())
        .filter(|a| !a.is_empty())
        .or_else(|| customer.address.clone())
        .ok_or(CartServiceError::MissingAddress)?;

    Ok(BuyerDetails {
        customer_id: Some(customer.id),
        name: Some(customer.name.clone()),
        phone: customer.phone.clone(),
        gstin: customer.gstin.as_deref().and_then(|g| Gstin::parse(g).ok()),
        state_code: customer.state_code.clone(),
        shipping_address: Some(shipping_address),
    })
}

/// Products a cart needs, directly or through its combos.
#[must_use]
fn referenced_products(cart: &SessionCart, combos: &[ComboOffer]) -> Vec<ProductId> {
    let mut ids = cart.product_ids();
    ids.extend(combos.iter().flat_map(|c| c.product_ids.iter().copied()));
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use bazaar_core::catalog::Product;
    use bazaar_core::{CategoryId, ComboId, CouponId, DiscountType};

    use super::*;

    fn product(id: i32, price: Decimal, gst_rate: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: Some(CategoryId::new(1)),
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
            stock: 50,
            gst_rate,
            hsn_code: None,
            is_featured: false,
            is_trending: false,
            is_new: false,
            active: true,
        }
    }

    fn combo() -> ComboOffer {
        ComboOffer {
            id: ComboId::new(9),
            name: "Breakfast Box".to_string(),
            description: None,
            product_ids: vec![ProductId::new(1), ProductId::new(2)],
            combo_price: dec!(250),
            display_position: 0,
            active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    fn coupon(code: &str, value: Decimal, min_cart_total: Option<Decimal>) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: code.to_string(),
            discount_type: DiscountType::Fixed,
            value,
            product_id: None,
            min_quantity: None,
            min_cart_total,
            starts_at: None,
            expires_at: None,
            usage_limit: None,
            used_count: 0,
            active: true,
        }
    }

    fn policy() -> DeliveryPolicy {
        DeliveryPolicy {
            default_fee: dec!(40),
            free_delivery_threshold: Some(dec!(500)),
        }
    }

    fn catalog() -> Vec<Product> {
        vec![product(1, dec!(200), dec!(5)), product(2, dec!(100), dec!(18))]
    }

    #[test]
    fn test_build_lines_prices_products_and_combos() {
        let mut cart = SessionCart::default();
        cart.add(CartItemRef::Product { product_id: ProductId::new(1) }, 2);
        cart.add(CartItemRef::Combo { combo_id: ComboId::new(9) }, 1);

        let built = build_lines(&cart, &catalog(), &[combo()], None, Utc::now());
        assert!(built.unavailable.is_empty());
        assert_eq!(built.lines.len(), 3);
        let combo_total: Decimal = built
            .lines
            .iter()
            .filter(|l| l.combo_id.is_some())
            .map(CartLine::gross)
            .sum();
        assert_eq!(combo_total, dec!(250));
    }

    #[test]
    fn test_missing_items_reported_unavailable() {
        let mut cart = SessionCart::default();
        cart.add(CartItemRef::Product { product_id: ProductId::new(7) }, 1);
        cart.add(CartItemRef::Combo { combo_id: ComboId::new(9) }, 1);

        let products = vec![product(1, dec!(200), dec!(5))];
        let built = build_lines(&cart, &products, &[combo()], None, Utc::now());
        assert!(built.lines.is_empty());
        assert_eq!(built.unavailable.len(), 2);
    }

    #[test]
    fn test_total_applies_coupon_and_delivery() {
        let mut cart = SessionCart::default();
        cart.add(CartItemRef::Product { product_id: ProductId::new(1) }, 2);
        let now = Utc::now();
        let built = build_lines(&cart, &catalog(), &[], None, now);

        let priced = total_cart(
            built,
            Some(coupon("SAVE50", dec!(50), None)),
            false,
            None,
            &policy(),
            now,
        )
        .unwrap();
        assert_eq!(priced.totals.subtotal, dec!(400));
        assert_eq!(priced.totals.coupon_discount, dec!(50));
        assert_eq!(priced.totals.delivery_fee, dec!(40));
        assert_eq!(priced.totals.payable, dec!(390));
        assert!(priced.coupon_error.is_none());
    }

    #[test]
    fn test_free_delivery_over_threshold() {
        let mut cart = SessionCart::default();
        cart.add(CartItemRef::Product { product_id: ProductId::new(1) }, 3);
        let now = Utc::now();
        let built = build_lines(&cart, &catalog(), &[], None, now);
        let priced = total_cart(built, None, false, None, &policy(), now).unwrap();
        assert_eq!(priced.totals.delivery_fee, Decimal::ZERO);
        assert_eq!(priced.totals.payable, dec!(600));
    }

    #[test]
    fn test_stale_coupon_reported_or_rejected() {
        let mut cart = SessionCart::default();
        cart.add(CartItemRef::Product { product_id: ProductId::new(2) }, 1);
        let now = Utc::now();

        let lenient = total_cart(
            build_lines(&cart, &catalog(), &[], None, now),
            Some(coupon("BIG1000", dec!(100), Some(dec!(1000)))),
            false,
            None,
            &policy(),
            now,
        )
        .unwrap();
        assert!(lenient.coupon.is_none());
        assert!(lenient.coupon_error.is_some());
        assert_eq!(lenient.totals.coupon_discount, Decimal::ZERO);

        let strict = total_cart(
            build_lines(&cart, &catalog(), &[], None, now),
            Some(coupon("BIG1000", dec!(100), Some(dec!(1000)))),
            true,
            None,
            &policy(),
            now,
        );
        assert!(matches!(
            strict,
            Err(CartServiceError::Coupon(CouponError::MinCartTotalNotMet { .. }))
        ));
    }

    #[test]
    fn test_empty_cart_has_no_delivery() {
        let priced = total_cart(
            BuiltLines::default(),
            None,
            false,
            None,
            &policy(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(priced.totals.payable, Decimal::ZERO);
        assert_eq!(priced.totals.delivery_fee, Decimal::ZERO);
    }

    #[test]
    fn test_referenced_products_dedups() {
        let mut cart = SessionCart::default();
        cart.add(CartItemRef::Product { product_id: ProductId::new(2) }, 1);
        let ids = referenced_products(&cart, &[combo()]);
        assert_eq!(ids, vec![ProductId::new(1), ProductId::new(2)]);
    }
}
