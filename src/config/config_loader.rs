use anyhow::{Context, Ok, Result, bail};
use chrono::{FixedOffset, Weekday};

use crate::{
    config::{config_model::UserSecret, stage::Stage},
    domain::value_objects::enums::booking_statuses::BookingStatus,
};

use super::config_model::DotEnvyConfig;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = super::config_model::Server {
        port: std::env::var("SERVER_PORT")
            .context("SERVER_PORT is invalid")?
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .context("SERVER_BODY_LIMIT is invalid")?
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .context("SERVER_TIMEOUT is invalid")?
            .parse()?,
    };

    let database = super::config_model::Database {
        url: std::env::var("DATABASE_URL").context("DATABASE_URL is invalid")?,
        max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
        statement_timeout_ms: env_or("BOOKING_STATEMENT_TIMEOUT_MS", 5_000)?,
    };

    let booking = super::config_model::Booking {
        open_hour: env_or("BOOKING_OPEN_HOUR", 9)?,
        close_hour: env_or("BOOKING_CLOSE_HOUR", 18)?,
        closed_weekdays: parse_weekdays(
            &std::env::var("BOOKING_CLOSED_WEEKDAYS").unwrap_or_else(|_| "sat,sun".to_string()),
        )?,
        utc_offset: parse_utc_offset(env_or("BOOKING_UTC_OFFSET_MINUTES", 0)?)?,
        blocking_statuses: parse_blocking_statuses(
            &std::env::var("BOOKING_BLOCKING_STATUSES")
                .unwrap_or_else(|_| "pending,active".to_string()),
        )?,
        cache_ttl_seconds: env_or("BOOKING_CACHE_TTL_SECONDS", 120)?,
        cache_max_entries: env_or("BOOKING_CACHE_MAX_ENTRIES", 10_000)?,
    };

    validate_timeouts(server.timeout, database.statement_timeout_ms)?;

    if booking.open_hour >= booking.close_hour || booking.close_hour > 24 {
        bail!(
            "BOOKING_OPEN_HOUR ({}) must be before BOOKING_CLOSE_HOUR ({})",
            booking.open_hour,
            booking.close_hour
        );
    }

    Ok(DotEnvyConfig {
        server,
        database,
        booking,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

pub fn get_user_secret() -> Result<UserSecret> {
    dotenvy::dotenv().ok();

    Ok(UserSecret {
        secret: std::env::var("JWT_USER_SECRET").context("JWT_USER_SECRET is invalid")?,
    })
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        std::result::Result::Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} is invalid")),
        _ => Ok(default),
    }
}

pub(crate) fn parse_weekdays(raw: &str) -> Result<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<Weekday>()
                .map_err(|_| anyhow::anyhow!("BOOKING_CLOSED_WEEKDAYS has invalid weekday: {part}"))
        })
        .collect()
}

pub(crate) fn parse_blocking_statuses(raw: &str) -> Result<Vec<BookingStatus>> {
    let mut statuses = Vec::new();
    for part in raw.split(',').filter(|part| !part.trim().is_empty()) {
        let status = BookingStatus::parse(part).ok_or_else(|| {
            anyhow::anyhow!("BOOKING_BLOCKING_STATUSES has invalid status: {part}")
        })?;
        if status == BookingStatus::Cancelled {
            bail!("BOOKING_BLOCKING_STATUSES cannot contain cancelled");
        }
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }

    // Active bookings always hold their slot.
    if !statuses.contains(&BookingStatus::Active) {
        statuses.push(BookingStatus::Active);
    }

    Ok(statuses)
}

fn parse_utc_offset(minutes: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| anyhow::anyhow!("BOOKING_UTC_OFFSET_MINUTES is out of range: {minutes}"))
}

/// A write transaction must give up before the HTTP layer does, otherwise it can
/// commit after the client was already told the request timed out.
pub fn validate_timeouts(server_timeout_secs: u64, statement_timeout_ms: u64) -> Result<()> {
    if statement_timeout_ms == 0 {
        bail!("BOOKING_STATEMENT_TIMEOUT_MS must be positive");
    }
    let server_timeout_ms = server_timeout_secs.saturating_mul(1_000);
    if statement_timeout_ms >= server_timeout_ms {
        bail!(
            "BOOKING_STATEMENT_TIMEOUT_MS ({statement_timeout_ms}) must be below SERVER_TIMEOUT ({server_timeout_secs}s)"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_budget_must_fit_inside_the_request_timeout() {
        assert!(validate_timeouts(30, 5_000).is_ok());
        assert!(validate_timeouts(5, 5_000).is_err());
        assert!(validate_timeouts(3, 5_000).is_err());
        assert!(validate_timeouts(30, 0).is_err());
    }

    #[test]
    fn weekdays_are_parsed_case_insensitively() {
        let weekdays = parse_weekdays("Sat, sunday").unwrap();
        assert_eq!(weekdays, vec![Weekday::Sat, Weekday::Sun]);
    }

    #[test]
    fn unknown_weekday_is_rejected() {
        assert!(parse_weekdays("sat,funday").is_err());
    }

    #[test]
    fn active_is_always_blocking() {
        let statuses = parse_blocking_statuses("pending").unwrap();
        assert_eq!(statuses, vec![BookingStatus::Pending, BookingStatus::Active]);
    }

    #[test]
    fn cancelled_cannot_block() {
        assert!(parse_blocking_statuses("active,cancelled").is_err());
    }

    #[test]
    fn blocking_statuses_are_deduplicated() {
        let statuses = parse_blocking_statuses(" Active ,active").unwrap();
        assert_eq!(statuses, vec![BookingStatus::Active]);
    }
}
