//! Customer pricing terms.
//!
//! The back office sets each customer's tier, subscription discount and
//! delivery terms, plus per-category overrides of the subscription discount.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::catalog::Customer;
use bazaar_core::pricing::CategoryDiscount;
use bazaar_core::{CategoryId, UserId};

use crate::db::CustomerRepository;
use crate::db::customers::{CategoryDiscountInput, PricingTermsInput};
use crate::error::Result;
use crate::middleware::RequireStoreManager;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    /// Matches name, email or phone.
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// A customer with everything that shapes their prices.
#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub subscription_active: bool,
    pub category_discounts: Vec<CategoryDiscount>,
}

#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<Vec<Customer>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let customers = CustomerRepository::new(state.pool())
        .list(query.q.as_deref(), limit)
        .await?;
    Ok(Json(customers))
}

#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
    Path(id): Path<UserId>,
) -> Result<Json<CustomerDetail>> {
    let (customer, pricing) = CustomerRepository::new(state.pool()).pricing(id).await?;
    Ok(Json(CustomerDetail {
        subscription_active: pricing.active_subscription(Utc::now()).is_some(),
        category_discounts: pricing.category_discounts,
        customer,
    }))
}

/// Set the customer's tier and subscription terms.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, customer_type = %input.customer_type))]
pub async fn update_pricing(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path(id): Path<UserId>,
    Json(input): Json<PricingTermsInput>,
) -> Result<Json<Customer>> {
    input.validate()?;
    let customer = CustomerRepository::new(state.pool())
        .update_pricing(id, &input)
        .await?;

    tracing::info!(customer_id = %customer.id, "Customer pricing updated");
    Ok(Json(customer))
}

#[instrument(skip(state, _admin))]
pub async fn category_discounts(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<CategoryDiscount>>> {
    Ok(Json(
        CustomerRepository::new(state.pool())
            .category_discounts(id)
            .await?,
    ))
}

/// Create or replace the override for one category.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, category_id = %input.category_id))]
pub async fn upsert_category_discount(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path(id): Path<UserId>,
    Json(input): Json<CategoryDiscountInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let discount = CustomerRepository::new(state.pool())
        .upsert_category_discount(id, &input)
        .await?;

    tracing::info!(customer_id = %id, category_id = %discount.category_id, "Category discount saved");
    Ok((StatusCode::OK, Json(discount)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_category_discount(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path((id, category_id)): Path<(UserId, CategoryId)>,
) -> Result<StatusCode> {
    CustomerRepository::new(state.pool())
        .delete_category_discount(id, category_id)
        .await?;
    tracing::info!(customer_id = %id, category_id = %category_id, "Category discount removed");
    Ok(StatusCode::NO_CONTENT)
}
