use chrono::{FixedOffset, Weekday};

use crate::domain::value_objects::enums::booking_statuses::BookingStatus;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub booking: Booking,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    /// Applied as `statement_timeout`/`lock_timeout` inside every booking transaction.
    pub statement_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub open_hour: u32,
    pub close_hour: u32,
    pub closed_weekdays: Vec<Weekday>,
    pub utc_offset: FixedOffset,
    pub blocking_statuses: Vec<BookingStatus>,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: usize,
}

#[derive(Debug, Clone)]
pub struct UserSecret {
    pub secret: String,
}
