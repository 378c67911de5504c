pub mod booking_errors;
pub mod booking_interval;
pub mod booking_list;
pub mod bookings;
pub mod enums;
pub mod pricing;
pub mod settlement;
pub mod slot_guard;
