use axum::http::StatusCode;
use thiserror::Error;

use super::enums::booking_statuses::BookingStatus;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid time format, expected YYYY-MM-DD HH")]
    InvalidFormat,
    #[error("invalid time range: end must be after start")]
    InvalidRange,
    #[error("bookings are not accepted on closed days")]
    ClosedDay,
    #[error("booking start must be in the future")]
    InThePast,
    #[error("booking must be within operating hours {open_hour:02}:00-{close_hour:02}:00")]
    OutsideHours { open_hour: u32, close_hour: u32 },
    #[error("the requested time slot is already taken")]
    SlotTaken,
    #[error("place not found")]
    ResourceNotFound,
    #[error("place is not available for booking")]
    ResourceInactive,
    #[error("insufficient funds: balance {balance}, required {required}, short by {deficit}")]
    InsufficientFunds {
        balance: i64,
        required: i64,
        deficit: i64,
    },
    #[error("booking not found")]
    BookingNotFound,
    #[error("invalid booking status")]
    InvalidStatus,
    #[error("cannot change booking status from {from} to {to}")]
    TransitionNotAllowed {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("only pending bookings can be changed, this booking is {status}")]
    RescheduleNotAllowed { status: BookingStatus },
    #[error("nothing to update")]
    EmptyPatch,
    #[error("not allowed to act on this booking")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn insufficient_funds(balance: i64, required: i64) -> Self {
        BookingError::InsufficientFunds {
            balance,
            required,
            deficit: required - balance,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::InvalidFormat
            | BookingError::InvalidRange
            | BookingError::ClosedDay
            | BookingError::InThePast
            | BookingError::OutsideHours { .. }
            | BookingError::ResourceNotFound
            | BookingError::ResourceInactive
            | BookingError::InvalidStatus
            | BookingError::EmptyPatch => StatusCode::BAD_REQUEST,
            BookingError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            BookingError::SlotTaken
            | BookingError::TransitionNotAllowed { .. }
            | BookingError::RescheduleNotAllowed { .. } => StatusCode::CONFLICT,
            BookingError::Forbidden => StatusCode::FORBIDDEN,
            BookingError::BookingNotFound => StatusCode::NOT_FOUND,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable reason for clients.
    pub fn reason(&self) -> &'static str {
        match self {
            BookingError::InvalidFormat => "invalid_format",
            BookingError::InvalidRange => "invalid_range",
            BookingError::ClosedDay => "closed_day",
            BookingError::InThePast => "in_the_past",
            BookingError::OutsideHours { .. } => "outside_hours",
            BookingError::SlotTaken => "slot_taken",
            BookingError::ResourceNotFound => "resource_not_found",
            BookingError::ResourceInactive => "resource_inactive",
            BookingError::InsufficientFunds { .. } => "insufficient_funds",
            BookingError::BookingNotFound => "booking_not_found",
            BookingError::InvalidStatus => "invalid_status",
            BookingError::TransitionNotAllowed { .. } => "transition_not_allowed",
            BookingError::RescheduleNotAllowed { .. } => "reschedule_not_allowed",
            BookingError::EmptyPatch => "empty_patch",
            BookingError::Forbidden => "forbidden",
            BookingError::Internal(_) => "internal",
        }
    }
}
