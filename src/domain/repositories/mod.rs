pub mod booking_cache;
pub mod bookings;
pub mod places;
pub mod settlement;
