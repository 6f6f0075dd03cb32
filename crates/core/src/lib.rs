//! Bazaar Core - Shared domain library.
//!
//! This crate provides the types and business rules used across all Bazaar
//! components:
//! - `storefront` - Public catalog, cart, checkout and booking API
//! - `admin` - Back-office API, point of sale and invoices
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains types and pure functions - no HTTP, and no I/O
//! outside the `postgres` feature. Every price shown to a customer, every POS
//! bill and every invoice is computed here so the two servers can never
//! disagree. With `postgres` enabled, `order_store` also holds the one order
//! transaction both servers run, so stock and coupon counts move the same way
//! from either channel.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money helpers, emails, GSTINs and status enums
//! - [`catalog`] - Product, category and customer records
//! - [`pricing`] - Sale, tier and subscription price resolution
//! - [`coupon`] - Coupon classification and evaluation
//! - [`cart`] - Cart totals with tax-inclusive GST decomposition
//! - [`order`] - Order records and purchase snapshots
//! - [`invoice`] - GST invoice construction (CGST/SGST/IGST breakdown)
//! - [`layout`] - Banner and home block row-packing
//! - [`combo`] - Combo offer validation and price allocation
//! - [`booking`] - Location hierarchy, slot generation and booking rules
//! - `order_store` - Placing and releasing orders (`postgres` feature)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod booking;
pub mod cart;
pub mod catalog;
pub mod combo;
pub mod coupon;
pub mod invoice;
pub mod layout;
pub mod order;
#[cfg(feature = "postgres")]
pub mod order_store;
pub mod pricing;
pub mod types;

pub use types::*;
