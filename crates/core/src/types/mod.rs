//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod gstin;
pub mod id;
pub mod money;
pub mod status;
pub mod window;

pub use email::{Email, EmailError};
pub use gstin::{Gstin, GstinError};
pub use id::*;
pub use money::{allocate_proportionally, clamp_percent, format_inr, percent_of, round_money};
pub use status::*;
pub use window::within_window;
