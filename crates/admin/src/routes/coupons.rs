//! Coupon management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use bazaar_core::CouponId;
use bazaar_core::coupon::Coupon;

use crate::db::CouponRepository;
use crate::db::coupons::CouponInput;
use crate::error::Result;
use crate::middleware::RequireStoreManager;
use crate::state::AppState;

#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(CouponRepository::new(state.pool()).list().await?))
}

/// Create a coupon. The code is stored upper-cased.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, code = %input.code))]
pub async fn create(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Json(input): Json<CouponInput>,
) -> Result<impl IntoResponse> {
    let kind = input.validate()?;
    let coupon = CouponRepository::new(state.pool()).create(&input).await?;

    tracing::info!(coupon_id = %coupon.id, code = %coupon.code, ?kind, "Coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn deactivate(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path(id): Path<CouponId>,
) -> Result<Json<Coupon>> {
    let coupon = CouponRepository::new(state.pool()).deactivate(id).await?;
    tracing::info!(coupon_id = %coupon.id, "Coupon deactivated");
    Ok(Json(coupon))
}
