use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::domain::value_objects::booking_errors::BookingError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, reason: &str, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            reason: reason.to_string(),
            details: None,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<&BookingError> for ErrorResponse {
    fn from(err: &BookingError) -> Self {
        let status = err.status_code();
        let message = match err {
            // Don't leak internal error detail to client
            BookingError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let details = match err {
            BookingError::InsufficientFunds {
                balance,
                required,
                deficit,
            } => Some(json!({
                "balance": balance,
                "required": required,
                "deficit": deficit,
            })),
            BookingError::OutsideHours {
                open_hour,
                close_hour,
            } => Some(json!({
                "open_hour": open_hour,
                "close_hour": close_hour,
            })),
            BookingError::TransitionNotAllowed { from, to } => Some(json!({
                "from": from,
                "to": to,
            })),
            _ => None,
        };

        Self {
            details,
            ..ErrorResponse::new(status, err.reason(), message)
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        ErrorResponse::from(&self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_carries_the_deficit() {
        let body = ErrorResponse::from(&BookingError::insufficient_funds(15_000, 20_000));

        assert_eq!(body.code, 402);
        assert_eq!(body.reason, "insufficient_funds");
        assert_eq!(
            body.details,
            Some(json!({"balance": 15_000, "required": 20_000, "deficit": 5_000}))
        );
    }

    #[test]
    fn internal_errors_are_opaque() {
        let body = ErrorResponse::from(&BookingError::Internal(anyhow::anyhow!(
            "relation \"bookings\" does not exist"
        )));

        assert_eq!(body.code, 500);
        assert_eq!(body.message, "Internal server error");
        assert!(body.details.is_none());
    }

    #[test]
    fn slot_taken_is_a_conflict() {
        let response = BookingError::SlotTaken.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
