//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{AdminUserId, Email};

pub use bazaar_core::AdminRole;

/// A back-office account (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
