//! Point of sale endpoints.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::services::PosService;
use crate::services::pos::{PosQuote, PosSaleRequest};
use crate::state::AppState;

/// Price a basket. Nothing is written.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id, items = request.items.len()))]
pub async fn quote(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(request): Json<PosSaleRequest>,
) -> Result<Json<PosQuote>> {
    let quote = PosService::new(state.pool())
        .quote(&request, Utc::now())
        .await?;
    Ok(Json(quote))
}

/// Record a completed counter sale.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id, items = request.items.len()))]
pub async fn record(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(request): Json<PosSaleRequest>,
) -> Result<impl IntoResponse> {
    let sale = PosService::new(state.pool())
        .record(&request, &admin, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}
