//! Point of sale.
//!
//! The counter sends product and combo ids with quantities. Prices come from
//! the catalog and the selected customer's terms, a cashier may key in a
//! manual discount, and no delivery fee is ever charged. A quote writes
//! nothing; recording the sale locks stock and counts the coupon in one
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::cart::{Adjustments, CartError, CartLine, CartTotals, ManualDiscount};
use bazaar_core::catalog::{Customer, Product};
use bazaar_core::combo::ComboOffer;
use bazaar_core::coupon::{Coupon, CouponDiscount, CouponError, CouponLine, normalize_code};
use bazaar_core::order::{BuyerDetails, NewOrder, Order};
use bazaar_core::pricing::{CustomerPricing, resolve_price};
use bazaar_core::{
    ComboId, Gstin, GstinError, OrderChannel, PaymentType, ProductId, UserId,
};

use crate::db::catalog::offer_components;
use crate::db::orders::PlaceOrderError;
use crate::db::{
    CatalogRepository, ComboRepository, CouponRepository, CustomerRepository, OrderRepository,
    RepositoryError,
};
use crate::models::CurrentAdmin;

/// Errors raised while quoting or recording a POS sale.
#[derive(Debug, Error)]
pub enum PosError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error("coupon {0} does not exist")]
    UnknownCoupon(String),
    #[error("product {0} is not available")]
    UnknownProduct(ProductId),
    #[error("combo {0} is not available")]
    UnknownCombo(ComboId),
    #[error("invalid buyer GSTIN: {0}")]
    InvalidGstin(#[from] GstinError),
    #[error(transparent)]
    PlaceOrder(#[from] PlaceOrderError),
}

/// One item rung up at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PosItem {
    Product { product_id: ProductId, quantity: u32 },
    Combo { combo_id: ComboId, quantity: u32 },
}

/// Buyer details typed in at the counter. Each field overrides the
/// selected customer's record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PosBuyer {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gstin: Option<String>,
    pub state_code: Option<String>,
}

/// A POS basket, as quoted and as sold.
#[derive(Debug, Clone, Deserialize)]
pub struct PosSaleRequest {
    pub items: Vec<PosItem>,
    pub customer_id: Option<UserId>,
    #[serde(default)]
    pub buyer: PosBuyer,
    pub manual_discount: Option<ManualDiscount>,
    pub coupon_code: Option<String>,
    pub payment_type: Option<PaymentType>,
}

/// Totals for a POS basket.
#[derive(Debug, Clone, Serialize)]
pub struct PosQuote {
    pub totals: CartTotals,
    pub coupon: Option<CouponDiscount>,
}

/// A recorded sale.
#[derive(Debug, Clone, Serialize)]
pub struct PosSale {
    pub order: Order,
    pub totals: CartTotals,
}

/// Prices and records counter sales.
pub struct PosService<'a> {
    pool: &'a PgPool,
}

impl<'a> PosService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Price a basket without writing anything.
    ///
    /// # Errors
    ///
    /// Fails on unknown items, an unknown or unusable coupon, or totals the
    /// cart rules reject.
    pub async fn quote(
        &self,
        request: &PosSaleRequest,
        now: DateTime<Utc>,
    ) -> Result<PosQuote, PosError> {
        let customer = self.customer(request.customer_id).await?;
        self.price(request, customer.as_ref().map(|(_, p)| p), now)
            .await
            .map(|(quote, _)| quote)
    }

    /// Price a basket and record it as a completed POS order.
    ///
    /// # Errors
    ///
    /// Everything [`PosService::quote`] rejects, plus an invalid buyer GSTIN,
    /// insufficient stock and a coupon that ran out meanwhile.
    pub async fn record(
        &self,
        request: &PosSaleRequest,
        cashier: &CurrentAdmin,
        now: DateTime<Utc>,
    ) -> Result<PosSale, PosError> {
        let customer = self.customer(request.customer_id).await?;
        let buyer = buyer_details(customer.as_ref().map(|(c, _)| c), &request.buyer)?;
        let (quote, coupon_id) = self
            .price(request, customer.as_ref().map(|(_, p)| p), now)
            .await?;

        let mut order = NewOrder::from_totals(
            OrderChannel::Pos,
            &quote.totals,
            buyer,
            request.payment_type,
            quote.coupon.as_ref().map(|c| c.code.clone()),
        );
        order.created_by = Some(cashier.id);

        let order = OrderRepository::new(self.pool)
            .place(&order, coupon_id)
            .await?;

        tracing::info!(
            order_id = %order.id,
            cashier_id = %cashier.id,
            payable = %quote.totals.payable,
            "POS sale recorded"
        );

        Ok(PosSale {
            order,
            totals: quote.totals,
        })
    }

    async fn customer(
        &self,
        id: Option<UserId>,
    ) -> Result<Option<(Customer, CustomerPricing)>, PosError> {
        match id {
            Some(id) => Ok(Some(CustomerRepository::new(self.pool).pricing(id).await?)),
            None => Ok(None),
        }
    }

    async fn coupon(&self, code: Option<&str>) -> Result<Option<Coupon>, PosError> {
        let Some(code) = code.map(normalize_code).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        CouponRepository::new(self.pool)
            .by_code(&code)
            .await?
            .map(Some)
            .ok_or(PosError::UnknownCoupon(code))
    }

    async fn price(
        &self,
        request: &PosSaleRequest,
        pricing: Option<&CustomerPricing>,
        now: DateTime<Utc>,
    ) -> Result<(PosQuote, Option<bazaar_core::CouponId>), PosError> {
        let combos_repo = ComboRepository::new(self.pool);
        let mut combos = Vec::new();
        for item in &request.items {
            if let PosItem::Combo { combo_id, .. } = item
                && !combos.iter().any(|c: &ComboOffer| c.id == *combo_id)
            {
                combos.push(
                    combos_repo
                        .get(*combo_id)
                        .await?
                        .ok_or(PosError::UnknownCombo(*combo_id))?,
                );
            }
        }

        let products = CatalogRepository::new(self.pool)
            .active_products_by_ids(&referenced_products(&request.items, &combos))
            .await?;

        let lines = build_lines(&request.items, &products, &combos, pricing, now)?;
        let coupon = self.coupon(request.coupon_code.as_deref()).await?;
        let coupon_id = coupon.as_ref().map(|c| c.id);
        let quote = quote_totals(lines, coupon.as_ref(), request.manual_discount, now)?;
        Ok((quote, coupon_id))
    }
}

/// Price every basket item; anything not on sale is an error at the counter.
fn build_lines(
    items: &[PosItem],
    products: &[Product],
    combos: &[ComboOffer],
    pricing: Option<&CustomerPricing>,
    now: DateTime<Utc>,
) -> Result<Vec<CartLine>, PosError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        match *item {
            PosItem::Product {
                product_id,
                quantity,
            } => {
                let product = products
                    .iter()
                    .find(|p| p.id == product_id)
                    .ok_or(PosError::UnknownProduct(product_id))?;
                let quote = resolve_price(&product.prices(), pricing, now);
                lines.push(CartLine {
                    product_id,
                    combo_id: None,
                    name: product.name.clone(),
                    hsn_code: product.hsn_code.clone(),
                    list_price: quote.list_price,
                    unit_price: quote.unit_price,
                    quantity,
                    gst_rate: product.gst_rate,
                });
            }
            PosItem::Combo { combo_id, quantity } => {
                let combo = combos
                    .iter()
                    .find(|c| c.id == combo_id && c.is_live(now))
                    .ok_or(PosError::UnknownCombo(combo_id))?;
                let components = offer_components(combo, products);
                if components.len() != combo.product_ids.len() {
                    return Err(PosError::UnknownCombo(combo_id));
                }
                lines.extend(combo.allocate(&components, quantity));
            }
        }
    }
    Ok(lines)
}

/// Redeem the coupon against standalone lines and total without delivery.
fn quote_totals(
    lines: Vec<CartLine>,
    coupon: Option<&Coupon>,
    manual_discount: Option<ManualDiscount>,
    now: DateTime<Utc>,
) -> Result<PosQuote, PosError> {
    let discount = match coupon {
        Some(coupon) => {
            let coupon_lines: Vec<CouponLine> = lines
                .iter()
                .filter(|line| line.combo_id.is_none())
                .map(|line| CouponLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    line_total: line.gross(),
                })
                .collect();
            let subtotal = lines.iter().map(CartLine::gross).sum();
            Some(coupon.evaluate(&coupon_lines, subtotal, now)?)
        }
        None => None,
    };

    let adjustments = Adjustments {
        coupon_discount: discount.as_ref().map(|d| d.amount).unwrap_or_default(),
        coupon_scope: discount.as_ref().and_then(CouponDiscount::scope),
        manual_discount,
        delivery_fee: rust_decimal::Decimal::ZERO,
    };
    let totals = CartTotals::compute(lines, &adjustments)?;

    Ok(PosQuote {
        totals,
        coupon: discount,
    })
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Buyer block for a POS order: counter input first, then the customer on
/// file. Walk-in sales may leave everything blank.
fn buyer_details(
    customer: Option<&Customer>,
    typed: &PosBuyer,
) -> Result<BuyerDetails, PosError> {
    let gstin = non_blank(typed.gstin.as_ref())
        .or_else(|| customer.and_then(|c| non_blank(c.gstin.as_ref())))
        .map(|g| Gstin::parse(&g))
        .transpose()?;

    let state_code = non_blank(typed.state_code.as_ref())
        .or_else(|| gstin.as_ref().map(|g| g.state_code().to_owned()))
        .or_else(|| customer.and_then(|c| non_blank(c.state_code.as_ref())));

    Ok(BuyerDetails {
        customer_id: customer.map(|c| c.id),
        name: non_blank(typed.name.as_ref()).or_else(|| customer.map(|c| c.name.clone())),
        phone: non_blank(typed.phone.as_ref())
            .or_else(|| customer.and_then(|c| c.phone.clone())),
        gstin,
        state_code,
        shipping_address: customer.and_then(|c| c.address.clone()),
    })
}

/// Products a basket needs, directly or through its combos.
fn referenced_products(items: &[PosItem], combos: &[ComboOffer]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = items
        .iter()
        .filter_map(|item| match item {
            PosItem::Product { product_id, .. } => Some(*product_id),
            PosItem::Combo { .. } => None,
        })
        .collect();
    ids.extend(combos.iter().flat_map(|c| c.product_ids.iter().copied()));
    ids.sort_unstable();
    ids.dedup();
    ids
}
