//! Cart and checkout route handlers.
//!
//! The cart lives in the session as ids and quantities. Every response
//! re-prices it for the current customer, so a stale price is never shown.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::CatalogRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CartItem, CartItemRef, SessionCart, session_keys};
use crate::services::cart::{CartService, PlacedOrder, PricedCart};
use crate::state::AppState;

/// Most units of one item a cart line may hold.
const MAX_LINE_QUANTITY: u32 = 99;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(flatten)]
    pub item: CartItemRef,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Quantity update request body. Zero removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(flatten)]
    pub item: CartItemRef,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    /// Falls back to the address on the customer's account.
    pub shipping_address: Option<String>,
}

/// A cart as returned to the client.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub coupon_code: Option<String>,
    #[serde(flatten)]
    pub priced: PricedCart,
}

async fn load_cart(session: &Session) -> Result<SessionCart> {
    Ok(session
        .get::<SessionCart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

async fn save_cart(session: &Session, cart: &SessionCart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

async fn priced_view(
    state: &AppState,
    cart: SessionCart,
    customer: Option<bazaar_core::UserId>,
) -> Result<Json<CartView>> {
    let priced = CartService::new(state.pool(), &state.config().delivery)
        .price(&cart, customer, Utc::now())
        .await?;
    Ok(Json(CartView {
        items: cart.items,
        coupon_code: cart.coupon_code,
        priced,
    }))
}

fn check_quantity(quantity: u32) -> Result<()> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_LINE_QUANTITY} units of an item per order"
        )));
    }
    Ok(())
}

/// Ensure the item can currently be bought.
async fn ensure_sellable(state: &AppState, item: CartItemRef) -> Result<()> {
    let catalog = CatalogRepository::new(state.pool());
    let sellable = match item {
        CartItemRef::Product { product_id } => {
            !catalog.products_by_ids(&[product_id]).await?.is_empty()
        }
        CartItemRef::Combo { combo_id } => catalog
            .combos_by_ids(&[combo_id])
            .await?
            .iter()
            .any(|c| c.is_live(Utc::now())),
    };
    if sellable {
        Ok(())
    } else {
        Err(AppError::NotFound("item is not available".to_string()))
    }
}

#[instrument(skip(state, session, customer))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    priced_view(&state, cart, customer.map(|c| c.id)).await
}

#[instrument(skip(state, session, customer))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    if request.quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
    }
    ensure_sellable(&state, request.item).await?;

    let mut cart = load_cart(&session).await?;
    cart.add(request.item, request.quantity);
    let total = cart
        .items
        .iter()
        .find(|line| line.item == request.item)
        .map_or(0, |line| line.quantity);
    check_quantity(total)?;
    save_cart(&session, &cart).await?;

    add_breadcrumb("cart", "Added item", None);
    priced_view(&state, cart, customer.map(|c| c.id)).await
}

#[instrument(skip(state, session, customer))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    check_quantity(request.quantity)?;
    let mut cart = load_cart(&session).await?;
    if !cart.set_quantity(request.item, request.quantity) {
        return Err(AppError::NotFound("item is not in the cart".to_string()));
    }
    save_cart(&session, &cart).await?;
    priced_view(&state, cart, customer.map(|c| c.id)).await
}

#[instrument(skip(state, session, customer))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    Json(item): Json<CartItemRef>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    if cart.remove(item) {
        save_cart(&session, &cart).await?;
    }
    priced_view(&state, cart, customer.map(|c| c.id)).await
}

/// Apply a coupon after checking it against the cart as it stands.
#[instrument(skip(state, session, customer))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
    Json(request): Json<CouponRequest>,
) -> Result<Json<CartView>> {
    let customer_id = customer.map(|c| c.id);
    let mut cart = load_cart(&session).await?;
    let discount = CartService::new(state.pool(), &state.config().delivery)
        .check_coupon(&cart, customer_id, &request.code, Utc::now())
        .await?;

    cart.coupon_code = Some(discount.code);
    save_cart(&session, &cart).await?;
    priced_view(&state, cart, customer_id).await
}

#[instrument(skip(state, session, customer))]
pub async fn remove_coupon(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(customer): OptionalAuth,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    if cart.coupon_code.take().is_some() {
        save_cart(&session, &cart).await?;
    }
    priced_view(&state, cart, customer.map(|c| c.id)).await
}

/// Place an online order for the session cart and empty it.
#[instrument(skip(state, session, customer, request), fields(customer_id = %customer.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    request: Option<Json<CheckoutRequest>>,
) -> Result<impl IntoResponse> {
    let Json(request) = request.unwrap_or_default();
    let cart = load_cart(&session).await?;

    let placed: PlacedOrder = CartService::new(state.pool(), &state.config().delivery)
        .checkout(&cart, customer.id, request.shipping_address, Utc::now())
        .await?;

    session.remove::<SessionCart>(session_keys::CART).await?;
    let order_id = placed.order_id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
    Ok((StatusCode::CREATED, Json(placed)))
}
