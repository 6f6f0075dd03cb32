//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST /api/auth/register            - Create account and sign in
//! POST /api/auth/login               - Sign in
//! POST /api/auth/logout              - Sign out (cart kept)
//!
//! # Account (requires auth)
//! GET  /api/account                  - Profile and pricing terms
//! GET  /api/account/orders           - Order history
//! GET  /api/account/bookings         - Booking history
//!
//! # Catalog
//! GET  /api/categories               - Categories in display order
//! GET  /api/products?category=&flag= - Product cards with price quotes
//! GET  /api/products/{slug}          - One product card
//! GET  /api/home                     - Packed banner and home block rows
//! GET  /api/combos                   - Live combos with savings
//!
//! # Cart
//! GET  /api/cart                     - Priced cart
//! POST /api/cart/items               - Add product or combo
//! POST /api/cart/items/update        - Set quantity (0 removes)
//! POST /api/cart/items/remove        - Remove item
//! POST /api/cart/coupon              - Apply coupon
//! POST /api/cart/coupon/remove       - Remove coupon
//! POST /api/checkout                 - Place online order (requires auth)
//!
//! # Bookings
//! GET  /api/locations?parent=        - Child locations (roots when absent)
//! GET  /api/providers?locality=      - Providers in a locality
//! GET  /api/providers/{id}/slots     - Slots for a date
//! POST /api/bookings                 - Book a slot (requires auth)
//! POST /api/bookings/{id}/cancel     - Cancel own booking (requires auth)
//! ```

pub mod account;
pub mod auth;
pub mod bookings;
pub mod cart;
pub mod combos;
pub mod home;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile))
        .route("/orders", get(account::orders))
        .route("/bookings", get(account::bookings))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(products::categories))
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route("/home", get(home::home))
        .route("/combos", get(combos::index))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", post(cart::add))
        .route("/items/update", post(cart::update))
        .route("/items/remove", post(cart::remove))
        .route("/coupon", post(cart::apply_coupon))
        .route("/coupon/remove", post(cart::remove_coupon))
}

/// Create the booking routes router.
pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/locations", get(bookings::locations))
        .route("/providers", get(bookings::providers))
        .route("/providers/{id}/slots", get(bookings::slots))
        .route("/bookings", post(bookings::book))
        .route("/bookings/{id}/cancel", post(bookings::cancel))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .nest("/account", account_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(cart::checkout))
        .merge(booking_routes())
        .layer(api_rate_limiter())
        // Auth gets its own, stricter limiter
        .nest("/auth", auth_routes().layer(auth_rate_limiter()));

    Router::new().nest("/api", api)
}
