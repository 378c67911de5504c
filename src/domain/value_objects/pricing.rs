use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{booking_errors::BookingError, booking_interval::BookingInterval};

const SECONDS_PER_HOUR: i128 = 3_600;

/// What the place catalog tells us about a bookable place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRate {
    pub place_id: Uuid,
    /// Minor currency units per hour.
    pub hourly_rate: i64,
    pub active: bool,
}

/// `round(hours * hourly_rate)` with half-up rounding, in exact integer arithmetic
/// so sub-hour intervals price the same on every run.
pub fn total_price(interval: &BookingInterval, hourly_rate: i64) -> i64 {
    let seconds = i128::from(interval.duration().num_seconds());
    let rate = i128::from(hourly_rate.max(0));
    let price = (seconds * rate + SECONDS_PER_HOUR / 2) / SECONDS_PER_HOUR;

    i64::try_from(price).unwrap_or(i64::MAX)
}

/// Prices an interval against a catalog lookup result.
pub fn quote(interval: &BookingInterval, place: Option<PlaceRate>) -> Result<i64, BookingError> {
    let place = place.ok_or(BookingError::ResourceNotFound)?;
    if !place.active {
        return Err(BookingError::ResourceInactive);
    }
    Ok(total_price(interval, place.hourly_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn interval(minutes: i64) -> BookingInterval {
        let start = Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap();
        BookingInterval::new(start, start + Duration::minutes(minutes)).unwrap()
    }

    fn place(hourly_rate: i64, active: bool) -> PlaceRate {
        PlaceRate {
            place_id: Uuid::new_v4(),
            hourly_rate,
            active,
        }
    }

    #[test]
    fn two_hours_at_ten_thousand() {
        assert_eq!(total_price(&interval(120), 10_000), 20_000);
    }

    #[test]
    fn fractional_hours_round_half_up() {
        // 30 minutes at 3 per hour is 1.5 -> 2
        assert_eq!(total_price(&interval(30), 3), 2);
        // 20 minutes at 1 per hour is 0.333 -> 0
        assert_eq!(total_price(&interval(20), 1), 0);
        // 10 minutes at 100 per hour is 16.67 -> 17
        assert_eq!(total_price(&interval(10), 100), 17);
    }

    #[test]
    fn recomputing_an_unchanged_interval_is_stable() {
        let slot = interval(90);
        let first = total_price(&slot, 12_345);
        for _ in 0..10 {
            assert_eq!(total_price(&slot, 12_345), first);
        }
    }

    #[test]
    fn missing_place_is_resource_not_found() {
        let err = quote(&interval(60), None).unwrap_err();
        assert!(matches!(err, BookingError::ResourceNotFound));
    }

    #[test]
    fn inactive_place_is_rejected() {
        let err = quote(&interval(60), Some(place(10_000, false))).unwrap_err();
        assert!(matches!(err, BookingError::ResourceInactive));
    }

    #[test]
    fn active_place_uses_its_own_rate() {
        assert_eq!(quote(&interval(60), Some(place(7_500, true))).unwrap(), 7_500);
        assert_eq!(quote(&interval(60), Some(place(2_000, true))).unwrap(), 2_000);
    }
}
