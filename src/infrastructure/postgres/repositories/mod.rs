pub mod account_ledger;
pub mod bookings;
pub mod places;
pub mod settlement;
