//! Location hierarchy, providers, slot generation and booking status.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::booking::{
    Booking, BookingError, Location, Provider, Slot, generate_slots, validate_parent,
};
use bazaar_core::{
    BookingId, BookingStatus, LocationId, LocationLevel, ProviderId, ServiceKind,
};

use super::{RepositoryError, conflict_on_constraint};

const PROVIDER_COLUMNS: &str = r"
    id, name, service, locality_id, address, phone, opening_time, closing_time,
    slot_minutes, slot_capacity, active
";

const SLOT_COLUMNS: &str = "id, provider_id, slot_date, start_time, end_time, capacity";

const BOOKING_COLUMNS: &str = "id, slot_id, customer_id, status, notes, created_at";

/// Why a booking-side write was refused.
#[derive(Debug, Error)]
pub enum BookingAdminError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error("providers must be placed in a locality, not a {0}")]
    NotALocality(LocationLevel),
    #[error("slot capacity must be at least 1")]
    InvalidCapacity,
}

impl From<sqlx::Error> for BookingAdminError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub name: String,
    pub level: LocationLevel,
    pub parent_id: Option<LocationId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderInput {
    pub name: String,
    pub service: ServiceKind,
    pub locality_id: LocationId,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub slot_minutes: i32,
    pub slot_capacity: i32,
}

impl ProviderInput {
    /// Check the provider's hours and slot settings.
    ///
    /// # Errors
    ///
    /// Returns the [`BookingAdminError`] describing the first problem.
    pub fn validate(&self) -> Result<(), BookingAdminError> {
        if self.slot_minutes <= 0 {
            return Err(BookingError::InvalidSlotLength.into());
        }
        if self.opening_time >= self.closing_time {
            return Err(BookingError::InvalidHours.into());
        }
        if self.slot_capacity <= 0 {
            return Err(BookingAdminError::InvalidCapacity);
        }
        Ok(())
    }
}

/// A booking with its customer and slot, for the back-office list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub provider_id: ProviderId,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
}

/// Repository for the booking vertical's back-office writes.
pub struct BookingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The whole location tree, parents before children.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn locations(&self) -> Result<Vec<Location>, RepositoryError> {
        let rows = sqlx::query_as::<_, Location>(
            "SELECT id, name, level, parent_id FROM shop.location ORDER BY level, name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError> {
        let row = sqlx::query_as::<_, Location>(
            "SELECT id, name, level, parent_id FROM shop.location WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Add a location under a parent of the level one above it.
    ///
    /// # Errors
    ///
    /// Returns `BookingAdminError::Booking` for a misplaced level,
    /// `RepositoryError::NotFound` for an unknown parent and
    /// `RepositoryError::Conflict` for a duplicate name under the same parent.
    pub async fn create_location(&self, input: &LocationInput) -> Result<Location, BookingAdminError> {
        let parent_level = match input.parent_id {
            Some(parent_id) => Some(
                self.location(parent_id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?
                    .level,
            ),
            None => None,
        };
        validate_parent(input.level, parent_level)?;

        let location = sqlx::query_as::<_, Location>(
            r"
            INSERT INTO shop.location (name, level, parent_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, level, parent_id
            ",
        )
        .bind(input.name.trim())
        .bind(input.level)
        .bind(input.parent_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "location already exists under this parent"))?;
        Ok(location)
    }

    /// Every provider, inactive ones included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn providers(&self) -> Result<Vec<Provider>, RepositoryError> {
        let rows = sqlx::query_as::<_, Provider>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM shop.provider ORDER BY name, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn provider(&self, id: ProviderId) -> Result<Option<Provider>, RepositoryError> {
        let row = sqlx::query_as::<_, Provider>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM shop.provider WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Register a provider in a locality.
    ///
    /// # Errors
    ///
    /// Returns `BookingAdminError::NotALocality` when the location is not a
    /// locality and `RepositoryError::NotFound` when it does not exist.
    pub async fn create_provider(&self, input: &ProviderInput) -> Result<Provider, BookingAdminError> {
        input.validate()?;
        let locality = self
            .location(input.locality_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if locality.level != LocationLevel::Locality {
            return Err(BookingAdminError::NotALocality(locality.level));
        }

        let provider = sqlx::query_as::<_, Provider>(&format!(
            r"
            INSERT INTO shop.provider (
                name, service, locality_id, address, phone, opening_time, closing_time,
                slot_minutes, slot_capacity
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PROVIDER_COLUMNS}
            "
        ))
        .bind(input.name.trim())
        .bind(input.service)
        .bind(input.locality_id)
        .bind(input.address.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.opening_time)
        .bind(input.closing_time)
        .bind(input.slot_minutes)
        .bind(input.slot_capacity)
        .fetch_one(self.pool)
        .await?;
        Ok(provider)
    }

    /// Generate a provider's slots for a date from its opening hours.
    ///
    /// Slots that already exist are kept as they are, so regenerating a day
    /// never disturbs its bookings. Returns every slot of the day.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown provider and
    /// `BookingAdminError::Booking` for unusable opening hours.
    pub async fn generate_slots(
        &self,
        provider_id: ProviderId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, BookingAdminError> {
        let provider = self
            .provider(provider_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let windows = generate_slots(
            date,
            provider.opening_time,
            provider.closing_time,
            provider.slot_minutes,
        )?;

        let mut tx = self.pool.begin().await?;
        for window in &windows {
            sqlx::query(
                r"
                INSERT INTO shop.slot (provider_id, slot_date, start_time, end_time, capacity)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (provider_id, slot_date, start_time) DO NOTHING
                ",
            )
            .bind(provider_id)
            .bind(window.date)
            .bind(window.start)
            .bind(window.end)
            .bind(provider.slot_capacity)
            .execute(&mut *tx)
            .await?;
        }

        let slots = sqlx::query_as::<_, Slot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM shop.slot WHERE provider_id = $1 AND slot_date = $2 ORDER BY start_time"
        ))
        .bind(provider_id)
        .bind(date)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(slots)
    }

    /// Bookings on or after a date, earliest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bookings_from(&self, from: NaiveDate) -> Result<Vec<BookingListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookingListing>(
            r"
            SELECT b.id, b.slot_id, b.customer_id, b.status, b.notes, b.created_at,
                   c.name AS customer_name, c.phone AS customer_phone,
                   s.provider_id, s.slot_date, s.start_time
            FROM shop.booking b
            JOIN shop.slot s ON s.id = b.slot_id
            JOIN shop.customer c ON c.id = b.customer_id
            WHERE s.slot_date >= $1
            ORDER BY s.slot_date, s.start_time, b.id
            ",
        )
        .bind(from)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Move a booking along its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown booking and
    /// `BookingAdminError::Booking` for a transition that is not allowed.
    pub async fn update_status(
        &self,
        id: BookingId,
        next: BookingStatus,
    ) -> Result<Booking, BookingAdminError> {
        let mut tx = self.pool.begin().await?;

        let current: BookingStatus =
            sqlx::query_scalar("SELECT status FROM shop.booking WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        let next = current.transition(next)?;

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
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProviderInput {
        ProviderInput {
            name: "Aqua Kids Pool".to_string(),
            service: ServiceKind::Swimming,
            locality_id: LocationId::new(9),
            address: None,
            phone: None,
            opening_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            closing_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            slot_minutes: 45,
            slot_capacity: 8,
        }
    }

    #[test]
    fn test_valid_provider() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_provider_hours_must_be_ordered() {
        let mut p = input();
        p.closing_time = p.opening_time;
        assert!(matches!(
            p.validate(),
            Err(BookingAdminError::Booking(BookingError::InvalidHours))
        ));
    }

    #[test]
    fn test_provider_capacity_must_be_positive() {
        let mut p = input();
        p.slot_capacity = 0;
        assert!(matches!(p.validate(), Err(BookingAdminError::InvalidCapacity)));
    }

    #[test]
    fn test_not_a_locality_message() {
        let err = BookingAdminError::NotALocality(LocationLevel::City);
        assert_eq!(err.to_string(), "providers must be placed in a locality, not a city");
    }
}
