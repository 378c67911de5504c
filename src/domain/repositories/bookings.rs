use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::bookings::{BookingDetailsEntity, BookingEntity, EditBookingEntity, InsertBookingEntity},
    value_objects::{
        booking_errors::BookingError, booking_list::ListBookingsFilter, slot_guard::SlotGuard,
    },
};

#[automock]
#[async_trait]
pub trait BookingRepository {
    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>>;

    /// Booking joined with its place and user.
    async fn find_details(&self, booking_id: Uuid) -> Result<Option<BookingDetailsEntity>>;

    /// Bookings the guard considers conflicting. Not serialized against writers.
    async fn find_conflicts(&self, guard: SlotGuard) -> Result<Vec<BookingEntity>>;

    /// Re-checks the guard and inserts under the place's lock.
    async fn insert_guarded(
        &self,
        booking: InsertBookingEntity,
        guard: SlotGuard,
    ) -> std::result::Result<BookingEntity, BookingError>;

    /// Applies `changes` to a booking that is still pending. When `guard` is set the
    /// slot is re-checked under the target place's lock first.
    async fn update_pending(
        &self,
        booking_id: Uuid,
        changes: EditBookingEntity,
        guard: Option<SlotGuard>,
    ) -> std::result::Result<BookingEntity, BookingError>;

    /// Returns the removed row, `None` when nothing matched.
    async fn delete(&self, booking_id: Uuid) -> Result<Option<BookingEntity>>;

    async fn list(&self, filter: ListBookingsFilter) -> Result<Vec<BookingEntity>>;
}
