//! Service provider bookings: location hierarchy, time slots and booking
//! lifecycle.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    BookingId, BookingStatus, LocationId, LocationLevel, ProviderId, ServiceKind, SlotId, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("a {level} must not have a parent")]
    UnexpectedParent { level: LocationLevel },
    #[error("a {level} needs a {expected} parent")]
    MissingParent {
        level: LocationLevel,
        expected: LocationLevel,
    },
    #[error("a {level} cannot be placed under a {parent}")]
    WrongParent {
        level: LocationLevel,
        parent: LocationLevel,
    },
    #[error("slot length must be at least one minute")]
    InvalidSlotLength,
    #[error("opening time must be before closing time")]
    InvalidHours,
    #[error("slot has already started")]
    SlotInPast,
    #[error("slot is fully booked")]
    SlotFull,
    #[error("cannot move a booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl LocationLevel {
    /// The level a location of this level must sit under.
    #[must_use]
    pub const fn parent_level(self) -> Option<Self> {
        match self {
            Self::Country => None,
            Self::State => Some(Self::Country),
            Self::City => Some(Self::State),
            Self::Locality => Some(Self::City),
        }
    }

    #[must_use]
    pub const fn child_level(self) -> Option<Self> {
        match self {
            Self::Country => Some(Self::State),
            Self::State => Some(Self::City),
            Self::City => Some(Self::Locality),
            Self::Locality => None,
        }
    }
}

/// Check that a location of `level` may sit under a parent of `parent`.
///
/// # Errors
///
/// Returns a [`BookingError`] describing the mismatch.
pub fn validate_parent(
    level: LocationLevel,
    parent: Option<LocationLevel>,
) -> Result<(), BookingError> {
    match (level.parent_level(), parent) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(BookingError::UnexpectedParent { level }),
        (Some(expected), None) => Err(BookingError::MissingParent { level, expected }),
        (Some(expected), Some(parent)) if expected == parent => Ok(()),
        (Some(_), Some(parent)) => Err(BookingError::WrongParent { level, parent }),
    }
}

/// A node in the Country -> State -> City -> Locality tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub level: LocationLevel,
    pub parent_id: Option<LocationId>,
}

/// A swimming or grooming provider operating in a locality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub service: ServiceKind,
    pub locality_id: LocationId,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub slot_minutes: i32,
    /// Bookings accepted per slot.
    pub slot_capacity: i32,
    pub active: bool,
}

/// A `[start, end)` booking window on a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotWindow {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SlotWindow {
    #[must_use]
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start)
    }
}

/// Cut the opening hours of `date` into contiguous windows of `slot_minutes`.
///
/// A trailing window that would run past closing is dropped.
///
/// # Errors
///
/// Returns [`BookingError::InvalidSlotLength`] for a non-positive length and
/// [`BookingError::InvalidHours`] when opening is not before closing.
pub fn generate_slots(
    date: NaiveDate,
    opening: NaiveTime,
    closing: NaiveTime,
    slot_minutes: i32,
) -> Result<Vec<SlotWindow>, BookingError> {
    if slot_minutes <= 0 {
        return Err(BookingError::InvalidSlotLength);
    }
    if opening >= closing {
        return Err(BookingError::InvalidHours);
    }

    let length = Duration::minutes(i64::from(slot_minutes));
    let closing_at = date.and_time(closing);
    let mut start = date.and_time(opening);
    let mut slots = Vec::new();
    while start + length <= closing_at {
        let end = start + length;
        slots.push(SlotWindow {
            date,
            start: start.time(),
            end: end.time(),
        });
        start = end;
    }
    Ok(slots)
}

/// A generated slot as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Slot {
    pub id: SlotId,
    pub provider_id: ProviderId,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32,
}

impl Slot {
    #[must_use]
    pub const fn window(&self) -> SlotWindow {
        SlotWindow {
            date: self.slot_date,
            start: self.start_time,
            end: self.end_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Booking {
    pub id: BookingId,
    pub slot_id: SlotId,
    pub customer_id: UserId,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Capacity and bookings held against a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub capacity: i32,
    /// Pending and confirmed bookings.
    pub booked: i32,
}

impl SlotAvailability {
    #[must_use]
    pub const fn remaining(&self) -> i32 {
        let remaining = self.capacity - self.booked;
        if remaining > 0 { remaining } else { 0 }
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.remaining() == 0
    }
}

impl BookingStatus {
    /// Whether a booking may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Completed | Self::Cancelled)
        )
    }

    /// Whether the booking holds a place in its slot.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Validated transition.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidTransition`] when not allowed.
    pub const fn transition(self, next: Self) -> Result<Self, BookingError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BookingError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

/// Check that a slot can take another booking at `now` (store local time).
///
/// # Errors
///
/// Returns [`BookingError::SlotInPast`] or [`BookingError::SlotFull`].
pub fn check_bookable(
    window: &SlotWindow,
    availability: SlotAvailability,
    now: NaiveDateTime,
) -> Result<(), BookingError> {
    if window.starts_at() <= now {
        return Err(BookingError::SlotInPast);
    }
    if availability.is_full() {
        return Err(BookingError::SlotFull);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_location_parent_rules() {
        assert!(validate_parent(LocationLevel::Country, None).is_ok());
        assert!(validate_parent(LocationLevel::City, Some(LocationLevel::State)).is_ok());
        assert_eq!(
            validate_parent(LocationLevel::Country, Some(LocationLevel::Country)),
            Err(BookingError::UnexpectedParent {
                level: LocationLevel::Country
            })
        );
        assert_eq!(
            validate_parent(LocationLevel::Locality, None),
            Err(BookingError::MissingParent {
                level: LocationLevel::Locality,
                expected: LocationLevel::City
            })
        );
        assert!(matches!(
            validate_parent(LocationLevel::Locality, Some(LocationLevel::State)),
            Err(BookingError::WrongParent { .. })
        ));
        assert_eq!(LocationLevel::City.child_level(), Some(LocationLevel::Locality));
    }

    #[test]
    fn test_generate_slots_drops_partial_tail() {
        let slots = generate_slots(date(), time(9, 0), time(11, 30), 45).unwrap();
        let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![time(9, 0), time(9, 45), time(10, 30)]);
        assert_eq!(slots.last().unwrap().end, time(11, 15));
    }

    #[test]
    fn test_generate_slots_exact_fit() {
        let slots = generate_slots(date(), time(10, 0), time(12, 0), 60).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.last().unwrap().end, time(12, 0));
    }

    #[test]
    fn test_generate_slots_rejects_bad_input() {
        assert_eq!(
            generate_slots(date(), time(9, 0), time(10, 0), 0),
            Err(BookingError::InvalidSlotLength)
        );
        assert_eq!(
            generate_slots(date(), time(10, 0), time(9, 0), 30),
            Err(BookingError::InvalidHours)
        );
        assert!(generate_slots(date(), time(9, 0), time(9, 20), 30).unwrap().is_empty());
    }

    #[test]
    fn test_availability() {
        let slot = SlotAvailability { capacity: 3, booked: 2 };
        assert_eq!(slot.remaining(), 1);
        assert!(!slot.is_full());
        let over = SlotAvailability { capacity: 2, booked: 5 };
        assert_eq!(over.remaining(), 0);
        assert!(over.is_full());
    }

    #[test]
    fn test_booking_transitions() {
        use BookingStatus::{Cancelled, Completed, Confirmed, Pending};
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Cancelled));
        assert_eq!(
            Completed.transition(Cancelled),
            Err(BookingError::InvalidTransition {
                from: Completed,
                to: Cancelled
            })
        );
        assert!(Confirmed.is_active());
        assert!(!Cancelled.is_active());
    }

    #[test]
    fn test_check_bookable() {
        let window = SlotWindow {
            date: date(),
            start: time(10, 0),
            end: time(10, 30),
        };
        let open = SlotAvailability { capacity: 2, booked: 0 };
        let before = date().and_time(time(9, 0));
        assert!(check_bookable(&window, open, before).is_ok());
        assert_eq!(
            check_bookable(&window, open, date().and_time(time(10, 0))),
            Err(BookingError::SlotInPast)
        );
        assert_eq!(
            check_bookable(&window, SlotAvailability { capacity: 2, booked: 2 }, before),
            Err(BookingError::SlotFull)
        );
    }

    #[test]
    fn test_stored_slot_window() {
        let slot = Slot {
            id: SlotId::new(7),
            provider_id: ProviderId::new(1),
            slot_date: date(),
            start_time: time(16, 0),
            end_time: time(16, 45),
            capacity: 4,
        };
        let window = slot.window();
        assert_eq!(window.starts_at(), date().and_time(time(16, 0)));
        assert_eq!(window.end, time(16, 45));
    }
}
