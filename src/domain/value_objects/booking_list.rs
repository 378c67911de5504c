use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    booking_errors::BookingError,
    booking_interval::parse_wire_time,
    bookings::BookingModel,
    enums::{
        booking_sort_keys::BookingSortKey, booking_statuses::BookingStatus,
        sort_order::SortOrder,
    },
};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

const CACHE_NAMESPACE: &str = "bookings:v1";

/// Raw query string of the listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListBookingsQuery {
    pub place_id: Option<Uuid>,
    pub status: Option<String>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    /// `YYYY-MM-DD HH`; bookings ending after this instant.
    pub from: Option<String>,
    /// `YYYY-MM-DD HH`; bookings starting before this instant.
    pub to: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListBookingsFilter {
    pub place_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub sort_by: BookingSortKey,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListBookingsFilter {
    fn default() -> Self {
        Self {
            place_id: None,
            status: None,
            price_min: None,
            price_max: None,
            from: None,
            to: None,
            sort_by: BookingSortKey::default(),
            order: SortOrder::default(),
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl ListBookingsFilter {
    pub fn normalize(query: ListBookingsQuery, offset: FixedOffset) -> Result<Self, BookingError> {
        let status = match query.status.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                Some(BookingStatus::parse(raw).ok_or(BookingError::InvalidStatus)?)
            }
            _ => None,
        };

        let from = query
            .from
            .as_deref()
            .map(|raw| parse_wire_time(raw, offset))
            .transpose()?;
        let to = query
            .to
            .as_deref()
            .map(|raw| parse_wire_time(raw, offset))
            .transpose()?;

        let limit = match query.limit {
            Some(limit) if limit > 0 => limit.min(MAX_PAGE_LIMIT),
            _ => DEFAULT_PAGE_LIMIT,
        };

        Ok(Self {
            place_id: query.place_id,
            status,
            price_min: query.price_min,
            price_max: query.price_max,
            from,
            to,
            sort_by: BookingSortKey::from_param(query.sort_by.as_deref()),
            order: SortOrder::from_param(query.order.as_deref()),
            limit,
            offset: query.offset.unwrap_or(0).max(0),
        })
    }

    /// Deterministic key for a normalized filter. The offset is only part of the
    /// key past the first page so the common first-page request shares one entry.
    pub fn cache_key(&self) -> String {
        let mut parts = vec![scope_prefix(self.place_id)];

        if self.from.is_some() || self.to.is_some() {
            parts.push(format!(
                "t:{}-{}",
                self.from.map(|t| t.timestamp().to_string()).unwrap_or_default(),
                self.to.map(|t| t.timestamp().to_string()).unwrap_or_default(),
            ));
        }

        if let Some(status) = self.status {
            parts.push(format!("status:{status}"));
        }

        if self.price_min.is_some() || self.price_max.is_some() {
            parts.push(format!(
                "price:{}-{}",
                self.price_min.map(|p| p.to_string()).unwrap_or_default(),
                self.price_max.map(|p| p.to_string()).unwrap_or_default(),
            ));
        }

        parts.push(format!("sort:{}.{}", self.sort_by, self.order.as_str()));
        parts.push(format!("lim:{}", self.limit));

        if self.offset > 0 {
            parts.push(format!("off:{}", self.offset));
        }

        parts.join(":")
    }
}

fn scope_prefix(place_id: Option<Uuid>) -> String {
    match place_id {
        Some(place_id) => format!("{CACHE_NAMESPACE}:place:{place_id}"),
        None => format!("{CACHE_NAMESPACE}:all"),
    }
}

/// Key prefixes whose entries may include bookings of `place_id`.
pub fn cache_prefixes_for_place(place_id: Uuid) -> Vec<String> {
    vec![
        format!("{}:", scope_prefix(Some(place_id))),
        format!("{}:", scope_prefix(None)),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingPage {
    pub items: Vec<BookingModel>,
    pub limit: i64,
    pub offset: i64,
}
