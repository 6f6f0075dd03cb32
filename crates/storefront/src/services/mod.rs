//! Business logic services for storefront.
//!
//! - `auth` - Customer registration and password login
//! - `cart` - Cart pricing, coupon checks and checkout

pub mod auth;
pub mod cart;
