//! Service provider browsing and slot booking.
//!
//! Slot times are store-local wall-clock times, so "has this slot started"
//! is judged against the server's local clock.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::booking::{Booking, Location, Provider, check_bookable};
use bazaar_core::{BookingId, LocationId, ProviderId, SlotId};

use crate::db::BookingRepository;
use crate::db::bookings::SlotOpening;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

const MAX_NOTES_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub parent: Option<LocationId>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderQuery {
    pub locality: LocationId,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    /// Defaults to today.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub slot_id: SlotId,
    pub notes: Option<String>,
}

/// A slot with what a shopper needs to pick it.
#[derive(Debug, Serialize)]
pub struct SlotView {
    #[serde(flatten)]
    pub opening: SlotOpening,
    pub remaining: i32,
    pub bookable: bool,
}

impl SlotView {
    #[must_use]
    pub fn new(opening: SlotOpening, now: NaiveDateTime) -> Self {
        let availability = opening.availability();
        let bookable = check_bookable(&opening.slot.window(), availability, now).is_ok();
        Self {
            remaining: availability.remaining(),
            bookable,
            opening,
        }
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn clean_notes(notes: Option<String>) -> Result<Option<String>> {
    let notes = notes
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty());
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH) {
        return Err(AppError::BadRequest(format!(
            "notes must be at most {MAX_NOTES_LENGTH} characters"
        )));
    }
    Ok(notes)
}

#[instrument(skip(state))]
pub async fn locations(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Vec<Location>>> {
    let locations = BookingRepository::new(state.pool())
        .locations(query.parent)
        .await?;
    Ok(Json(locations))
}

#[instrument(skip(state))]
pub async fn providers(
    State(state): State<AppState>,
    Query(query): Query<ProviderQuery>,
) -> Result<Json<Vec<Provider>>> {
    let providers = BookingRepository::new(state.pool())
        .providers(query.locality)
        .await?;
    Ok(Json(providers))
}

#[instrument(skip(state))]
pub async fn slots(
    State(state): State<AppState>,
    Path(provider_id): Path<ProviderId>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Vec<SlotView>>> {
    let repo = BookingRepository::new(state.pool());
    repo.provider(provider_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("provider {provider_id}")))?;

    let now = local_now();
    let date = query.date.unwrap_or_else(|| now.date());
    let slots = repo
        .slots(provider_id, date)
        .await?
        .into_iter()
        .map(|opening| SlotView::new(opening, now))
        .collect();
    Ok(Json(slots))
}

#[instrument(skip(state, customer, request), fields(customer_id = %customer.id))]
pub async fn book(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Json(request): Json<BookRequest>,
) -> Result<impl IntoResponse> {
    let notes = clean_notes(request.notes)?;
    let booking: Booking = BookingRepository::new(state.pool())
        .book(request.slot_id, customer.id, notes.as_deref(), local_now())
        .await?;

    tracing::info!(booking_id = %booking.id, slot_id = %booking.slot_id, "Slot booked");
    Ok((StatusCode::CREATED, Json(booking)))
}

#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Path(booking_id): Path<BookingId>,
) -> Result<Json<Booking>> {
    let booking = BookingRepository::new(state.pool())
        .cancel(booking_id, customer.id)
        .await?;
    Ok(Json(booking))
}
