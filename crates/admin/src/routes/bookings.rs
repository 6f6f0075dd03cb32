//! Locations, service providers, slot generation and booking status.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::booking::{Booking, Location, Provider, Slot};
use bazaar_core::{BookingId, BookingStatus, ProviderId};

use crate::db::BookingRepository;
use crate::db::bookings::{BookingListing, LocationInput, ProviderInput};
use crate::error::Result;
use crate::middleware::RequireStoreManager;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SlotRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct BookingQuery {
    /// Defaults to today.
    pub from: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
}

#[instrument(skip(state, _admin))]
pub async fn locations(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
) -> Result<Json<Vec<Location>>> {
    Ok(Json(BookingRepository::new(state.pool()).locations().await?))
}

/// Add a location under a parent of the level above it.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, level = %input.level))]
pub async fn create_location(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Json(input): Json<LocationInput>,
) -> Result<impl IntoResponse> {
    let location = BookingRepository::new(state.pool())
        .create_location(&input)
        .await?;
    tracing::info!(location_id = %location.id, "Location created");
    Ok((StatusCode::CREATED, Json(location)))
}

#[instrument(skip(state, _admin))]
pub async fn providers(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
) -> Result<Json<Vec<Provider>>> {
    Ok(Json(BookingRepository::new(state.pool()).providers().await?))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, name = %input.name))]
pub async fn create_provider(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Json(input): Json<ProviderInput>,
) -> Result<impl IntoResponse> {
    let provider = BookingRepository::new(state.pool())
        .create_provider(&input)
        .await?;
    tracing::info!(provider_id = %provider.id, "Provider created");
    Ok((StatusCode::CREATED, Json(provider)))
}

/// Generate a day's slots from the provider's hours. Safe to repeat.
#[instrument(skip(state, admin), fields(admin_id = %admin.id, date = %request.date))]
pub async fn generate_slots(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path(id): Path<ProviderId>,
    Json(request): Json<SlotRequest>,
) -> Result<Json<Vec<Slot>>> {
    let slots = BookingRepository::new(state.pool())
        .generate_slots(id, request.date)
        .await?;
    tracing::info!(provider_id = %id, slots = slots.len(), "Slots generated");
    Ok(Json(slots))
}

/// Upcoming bookings with customer and slot details.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireStoreManager(_admin): RequireStoreManager,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Vec<BookingListing>>> {
    let from = query.from.unwrap_or_else(|| Local::now().date_naive());
    Ok(Json(
        BookingRepository::new(state.pool())
            .bookings_from(from)
            .await?,
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id, status = %request.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStoreManager(admin): RequireStoreManager,
    Path(id): Path<BookingId>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Booking>> {
    let booking = BookingRepository::new(state.pool())
        .update_status(id, request.status)
        .await?;
    tracing::info!(booking_id = %booking.id, status = %booking.status, "Booking status changed");
    Ok(Json(booking))
}
