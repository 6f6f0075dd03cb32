//! Scheduling windows for sales, subscriptions, coupons, banners and combos.

use chrono::{DateTime, Utc};

/// Whether `now` falls in the half-open window `[starts_at, ends_at)`.
///
/// A missing bound leaves that side open. The window is over at `ends_at`
/// itself, so a sale ending at midnight is not running at midnight.
#[must_use]
pub fn within_window(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    starts_at.is_none_or(|start| start <= now) && ends_at.is_none_or(|end| now < end)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_window_bounds() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();

        assert!(within_window(Some(start), Some(end), start));
        assert!(within_window(Some(start), Some(end), end - Duration::seconds(1)));
        assert!(!within_window(Some(start), Some(end), end));
        assert!(!within_window(Some(start), Some(end), start - Duration::seconds(1)));
    }

    #[test]
    fn test_open_bounds() {
        let now = Utc::now();
        assert!(within_window(None, None, now));
        assert!(within_window(None, Some(now + Duration::days(1)), now));
        assert!(!within_window(None, Some(now), now));
        assert!(within_window(Some(now), None, now));
    }
}
