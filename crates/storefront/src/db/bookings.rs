//! Locations, providers, slots and customer bookings.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::booking::{
    Booking, BookingError, Location, Provider, Slot, SlotAvailability, check_bookable,
};
use bazaar_core::{BookingId, BookingStatus, LocationId, ProviderId, SlotId, UserId};

use super::RepositoryError;

const PROVIDER_COLUMNS: &str = r"
    id, name, service, locality_id, address, phone, opening_time, closing_time,
    slot_minutes, slot_capacity, active
";

const BOOKING_COLUMNS: &str = "id, slot_id, customer_id, status, notes, created_at";

/// Why a booking could not be made or changed.
#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl From<sqlx::Error> for BookError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// A slot with the number of places already taken.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SlotOpening {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub slot: Slot,
    pub booked: i32,
}

impl SlotOpening {
    #[must_use]
    pub const fn availability(&self) -> SlotAvailability {
        SlotAvailability {
            capacity: self.slot.capacity,
            booked: self.booked,
        }
    }
}

/// A booking with its slot and provider, for the customer's history.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub slot_date: NaiveDate,
    pub start_time: chrono::NaiveTime,
    pub end_time: chrono::NaiveTime,
}

/// Repository for the service booking tables.
pub struct BookingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Children of `parent`, or the top level when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn locations(&self, parent: Option<LocationId>) -> Result<Vec<Location>, RepositoryError> {
        let rows = sqlx::query_as::<_, Location>(
            r"
            SELECT id, name, level, parent_id
            FROM shop.location
            WHERE parent_id IS NOT DISTINCT FROM $1
            ORDER BY name
            ",
        )
        .bind(parent)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn providers(&self, locality: LocationId) -> Result<Vec<Provider>, RepositoryError> {
        let rows = sqlx::query_as::<_, Provider>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM shop.provider WHERE locality_id = $1 AND active ORDER BY name"
        ))
        .bind(locality)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn provider(&self, id: ProviderId) -> Result<Option<Provider>, RepositoryError> {
        let row = sqlx::query_as::<_, Provider>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM shop.provider WHERE id = $1 AND active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// A provider's slots on a date with the places already taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slots(
        &self,
        provider: ProviderId,
        date: NaiveDate,
    ) -> Result<Vec<SlotOpening>, RepositoryError> {
        let rows = sqlx::query_as::<_, SlotOpening>(
            r"
            SELECT s.id, s.provider_id, s.slot_date, s.start_time, s.end_time, s.capacity,
                   COUNT(b.id) FILTER (WHERE b.status IN ('pending', 'confirmed'))::INT AS booked
            FROM shop.slot s
            LEFT JOIN shop.booking b ON b.slot_id = s.id
            WHERE s.provider_id = $1 AND s.slot_date = $2
            GROUP BY s.id
            ORDER BY s.start_time
            ",
        )
        .bind(provider)
        .bind(date)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Book a place in a slot.
    ///
    /// The slot row is locked so concurrent bookings cannot exceed capacity.
    ///
    /// # Errors
    ///
    /// Returns `BookError::Repository(NotFound)` for an unknown slot and
    /// `BookError::Booking` when the slot has started or is full.
    pub async fn book(
        &self,
        slot_id: SlotId,
        customer_id: UserId,
        notes: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Booking, BookError> {
        let mut tx = self.pool.begin().await?;

        let slot = sqlx::query_as::<_, Slot>(
            r"
            SELECT s.id, s.provider_id, s.slot_date, s.start_time, s.end_time, s.capacity
            FROM shop.slot s
            JOIN shop.provider p ON p.id = s.provider_id AND p.active
            WHERE s.id = $1
            FOR UPDATE OF s
            ",
        )
        .bind(slot_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let booked: i32 = sqlx::query_scalar(
            "SELECT COUNT(*)::INT FROM shop.booking WHERE slot_id = $1 AND status IN ('pending', 'confirmed')",
        )
        .bind(slot_id)
        .fetch_one(&mut *tx)
        .await?;

        check_bookable(
            &slot.window(),
            SlotAvailability {
                capacity: slot.capacity,
                booked,
            },
            now,
        )?;

        let booking = sqlx::query_as::<_, Booking>(&format!(
            r"
            INSERT INTO shop.booking (slot_id, customer_id, notes)
            VALUES ($1, $2, $3)
            RETURNING {BOOKING_COLUMNS}
            "
        ))
        .bind(slot_id)
        .bind(customer_id)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(booking)
    }

    /// Cancel one of the customer's bookings.
    ///
    /// # Errors
    ///
    /// Returns `BookError::Repository(NotFound)` if the booking is not the
    /// customer's and `BookError::Booking` if it can no longer be cancelled.
    pub async fn cancel(&self, id: BookingId, customer_id: UserId) -> Result<Booking, BookError> {
        let mut tx = self.pool.begin().await?;

        let current: BookingStatus = sqlx::query_scalar(
            "SELECT status FROM shop.booking WHERE id = $1 AND customer_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let next = current.transition(BookingStatus::Cancelled)?;

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE shop.booking SET status = $2 WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(booking)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: UserId,
    ) -> Result<Vec<BookingDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookingDetail>(
            r"
            SELECT b.id, b.slot_id, b.customer_id, b.status, b.notes, b.created_at,
                   p.id AS provider_id, p.name AS provider_name,
                   s.slot_date, s.start_time, s.end_time
            FROM shop.booking b
            JOIN shop.slot s ON s.id = b.slot_id
            JOIN shop.provider p ON p.id = s.provider_id
            WHERE b.customer_id = $1
            ORDER BY s.slot_date DESC, s.start_time DESC
            ",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    #[test]
    fn test_slot_opening_serializes_flat() {
        let opening = SlotOpening {
            slot: Slot {
                id: SlotId::new(3),
                provider_id: ProviderId::new(1),
                slot_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
                capacity: 3,
            },
            booked: 3,
        };
        assert!(opening.availability().is_full());
        let json = serde_json::to_value(&opening).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["booked"], 3);
        assert_eq!(json["start_time"], "07:00:00");
    }
}
