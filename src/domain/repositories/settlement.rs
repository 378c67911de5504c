use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    booking_errors::BookingError, enums::booking_statuses::BookingStatus,
    settlement::TransitionReceipt,
};

#[automock]
#[async_trait]
pub trait BookingSettlementRepository {
    /// Moves a booking to `to` and applies the matching debit or credit in one
    /// transaction. Either both writes commit or neither does.
    async fn transition(
        &self,
        booking_id: Uuid,
        to: BookingStatus,
    ) -> Result<TransitionReceipt, BookingError>;
}
