//! Session-held models for the storefront.

pub mod session;

pub use session::{CartItem, CartItemRef, CurrentCustomer, SessionCart, keys as session_keys};
