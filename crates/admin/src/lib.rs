//! Bazaar Admin library.
//!
//! This crate provides the back-office functionality as a library,
//! allowing it to be tested and reused by the CLI.
//!
//! # Security
//!
//! This crate writes the catalog, prices, coupons and merchandising the
//! storefront serves, and records POS sales. Every route requires a
//! signed-in admin; cashiers are limited to the counter.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
