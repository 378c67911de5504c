use uuid::Uuid;

use crate::domain::entities::bookings::BookingEntity;

use super::{
    booking_errors::BookingError, booking_interval::BookingInterval,
    enums::booking_statuses::BookingStatus,
};

/// A candidate slot together with the statuses that count as occupying it.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotGuard {
    pub place_id: Uuid,
    pub interval: BookingInterval,
    pub blocking: Vec<BookingStatus>,
    /// The booking being moved never conflicts with itself.
    pub exclude_booking_id: Option<Uuid>,
}

impl SlotGuard {
    pub fn new(place_id: Uuid, interval: BookingInterval, blocking: &[BookingStatus]) -> Self {
        Self {
            place_id,
            interval,
            blocking: blocking.to_vec(),
            exclude_booking_id: None,
        }
    }

    pub fn excluding(mut self, booking_id: Uuid) -> Self {
        self.exclude_booking_id = Some(booking_id);
        self
    }

    /// Guard used when a booking becomes active: only other active bookings matter.
    pub fn for_activation(booking: &BookingEntity) -> Result<Self, BookingError> {
        let interval = BookingInterval::new(booking.start_time, booking.end_time)?;
        Ok(Self::new(booking.place_id, interval, &[BookingStatus::Active]).excluding(booking.id))
    }

    pub fn blocking_values(&self) -> Vec<String> {
        self.blocking.iter().map(|s| s.to_string()).collect()
    }

    pub fn conflicts_with(&self, booking: &BookingEntity) -> bool {
        booking.place_id == self.place_id
            && self.exclude_booking_id != Some(booking.id)
            && BookingStatus::parse(&booking.status).is_some_and(|s| self.blocking.contains(&s))
            && self
                .interval
                .overlaps_span(booking.start_time, booking.end_time)
    }

    pub fn ensure_free(&self, existing: &[BookingEntity]) -> Result<(), BookingError> {
        if existing.iter().any(|booking| self.conflicts_with(booking)) {
            return Err(BookingError::SlotTaken);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 7, hour, 0, 0).unwrap()
    }

    fn booking(place_id: Uuid, start: u32, end: u32, status: BookingStatus) -> BookingEntity {
        BookingEntity {
            id: Uuid::new_v4(),
            place_id,
            user_id: Uuid::new_v4(),
            start_time: at(start),
            end_time: at(end),
            total_price: 0,
            status: status.to_string(),
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[test]
    fn overlapping_active_booking_takes_the_slot() {
        let place_id = Uuid::new_v4();
        let existing = vec![booking(place_id, 10, 12, BookingStatus::Active)];
        let guard = SlotGuard::new(
            place_id,
            BookingInterval::new(at(11), at(13)).unwrap(),
            &[BookingStatus::Active],
        );

        assert!(matches!(
            guard.ensure_free(&existing),
            Err(BookingError::SlotTaken)
        ));
    }

    #[test]
    fn back_to_back_bookings_are_free() {
        let place_id = Uuid::new_v4();
        let existing = vec![booking(place_id, 10, 12, BookingStatus::Active)];
        let guard = SlotGuard::new(
            place_id,
            BookingInterval::new(at(12), at(14)).unwrap(),
            &[BookingStatus::Active],
        );

        assert!(guard.ensure_free(&existing).is_ok());
    }

    #[test]
    fn only_blocking_statuses_conflict() {
        let place_id = Uuid::new_v4();
        let existing = vec![
            booking(place_id, 10, 12, BookingStatus::Pending),
            booking(place_id, 10, 12, BookingStatus::Cancelled),
        ];
        let interval = BookingInterval::new(at(10), at(12)).unwrap();

        let active_only = SlotGuard::new(place_id, interval, &[BookingStatus::Active]);
        assert!(active_only.ensure_free(&existing).is_ok());

        let pending_blocks = SlotGuard::new(
            place_id,
            interval,
            &[BookingStatus::Pending, BookingStatus::Active],
        );
        assert!(pending_blocks.ensure_free(&existing).is_err());
    }

    #[test]
    fn other_places_and_the_booking_itself_never_conflict() {
        let place_id = Uuid::new_v4();
        let own = booking(place_id, 10, 12, BookingStatus::Active);
        let elsewhere = booking(Uuid::new_v4(), 10, 12, BookingStatus::Active);

        let guard = SlotGuard::for_activation(&own).unwrap();
        assert!(guard.ensure_free(&[own.clone(), elsewhere]).is_ok());
    }
}
