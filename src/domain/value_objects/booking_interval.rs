use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Timelike, Utc, Weekday};

use super::booking_errors::BookingError;

const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// Half-open `[start, end)` with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl BookingInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BookingError> {
        if end <= start {
            return Err(BookingError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps_span(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }

    pub fn overlaps(&self, other: &BookingInterval) -> bool {
        self.overlaps_span(other.start, other.end)
    }
}

/// Business rules for when a place can be booked.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPolicy {
    pub open_hour: u32,
    pub close_hour: u32,
    pub closed_weekdays: Vec<Weekday>,
    /// Offset the wire format and the opening hours are expressed in.
    pub utc_offset: FixedOffset,
}

impl Default for OperatingPolicy {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 18,
            closed_weekdays: vec![Weekday::Sat, Weekday::Sun],
            utc_offset: Utc.fix(),
        }
    }
}

impl OperatingPolicy {
    /// Parses and checks a raw request. Pure: no I/O, `now` is supplied by the caller.
    pub fn validate_request(
        &self,
        raw_start: &str,
        raw_end: &str,
        now: DateTime<Utc>,
    ) -> Result<BookingInterval, BookingError> {
        let start = parse_wire_time(raw_start, self.utc_offset)?;
        let end = parse_wire_time(raw_end, self.utc_offset)?;
        let interval = BookingInterval::new(start, end)?;
        self.check(&interval, now)?;
        Ok(interval)
    }

    /// Order matters: closed day, then past, then opening hours.
    pub fn check(&self, interval: &BookingInterval, now: DateTime<Utc>) -> Result<(), BookingError> {
        let local_start = interval.start().with_timezone(&self.utc_offset);
        let local_end = interval.end().with_timezone(&self.utc_offset);

        if self.closed_weekdays.contains(&local_start.weekday()) {
            return Err(BookingError::ClosedDay);
        }

        if interval.start() <= now {
            return Err(BookingError::InThePast);
        }

        let opens_at = i64::from(self.open_hour) * SECONDS_PER_HOUR;
        let closes_at = i64::from(self.close_hour) * SECONDS_PER_HOUR;

        let start_secs = i64::from(local_start.num_seconds_from_midnight());
        // Measured from the start day's midnight so an overnight end lands past closing.
        let end_secs = (local_end.date_naive() - local_start.date_naive()).num_days()
            * SECONDS_PER_DAY
            + i64::from(local_end.num_seconds_from_midnight());

        if start_secs < opens_at || end_secs > closes_at {
            return Err(BookingError::OutsideHours {
                open_hour: self.open_hour,
                close_hour: self.close_hour,
            });
        }

        Ok(())
    }
}

pub fn parse_wire_time(raw: &str, offset: FixedOffset) -> Result<DateTime<Utc>, BookingError> {
    let (date_part, hour_part) = raw
        .trim()
        .split_once(' ')
        .ok_or(BookingError::InvalidFormat)?;

    if hour_part.is_empty()
        || hour_part.len() > 2
        || !hour_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(BookingError::InvalidFormat);
    }

    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidFormat)?;
    let hour: u32 = hour_part.parse().map_err(|_| BookingError::InvalidFormat)?;
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or(BookingError::InvalidFormat)?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or(BookingError::InvalidFormat)
}
