//! Business logic services for admin.
//!
//! - `auth` - Back-office accounts and password login
//! - `pos` - Counter quotes and sales

pub mod auth;
pub mod pos;

pub use auth::{AdminAuthError, AdminAuthService};
pub use pos::{PosError, PosService};
