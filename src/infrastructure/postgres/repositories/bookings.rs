use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, delete, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            bookings::{BookingDetailsEntity, BookingEntity, EditBookingEntity, InsertBookingEntity},
            places::PlaceEntity,
            users::UserBalanceEntity,
        },
        repositories::bookings::BookingRepository,
        value_objects::{
            booking_errors::BookingError,
            booking_list::ListBookingsFilter,
            enums::{
                booking_sort_keys::BookingSortKey, booking_statuses::BookingStatus,
                sort_order::SortOrder,
            },
            slot_guard::SlotGuard,
        },
    },
    infrastructure::postgres::{
        db_errors::{TransactionBudget, apply_transaction_timeouts, lock_place},
        postgres_connection::PgPoolSquad,
        schema::{bookings, places, users},
    },
};

pub struct BookingPostgres {
    db_pool: Arc<PgPoolSquad>,
    statement_timeout_ms: u64,
}

impl BookingPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>, statement_timeout_ms: u64) -> Self {
        Self {
            db_pool,
            statement_timeout_ms,
        }
    }
}

/// Bookings of the guarded place whose `[start, end)` intersects the guard's interval
/// and whose status is one the guard treats as blocking.
pub(super) fn load_conflicts(
    conn: &mut PgConnection,
    guard: &SlotGuard,
) -> QueryResult<Vec<BookingEntity>> {
    let mut query = bookings::table
        .select(BookingEntity::as_select())
        .filter(bookings::place_id.eq(guard.place_id))
        .filter(bookings::status.eq_any(guard.blocking_values()))
        .filter(bookings::start_time.lt(guard.interval.end()))
        .filter(bookings::end_time.gt(guard.interval.start()))
        .into_boxed();

    if let Some(exclude_booking_id) = guard.exclude_booking_id {
        query = query.filter(bookings::id.ne(exclude_booking_id));
    }

    query.load::<BookingEntity>(conn)
}

#[async_trait]
impl BookingRepository for BookingPostgres {
    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Option<BookingEntity>> {
            let mut conn = db_pool.get()?;

            let result = bookings::table
                .find(booking_id)
                .select(BookingEntity::as_select())
                .first::<BookingEntity>(&mut conn)
                .optional()?;

            Ok(result)
        })
        .await?
    }

    async fn find_details(&self, booking_id: Uuid) -> Result<Option<BookingDetailsEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Option<BookingDetailsEntity>> {
            let mut conn = db_pool.get()?;

            let row = bookings::table
                .inner_join(places::table)
                .inner_join(users::table)
                .filter(bookings::id.eq(booking_id))
                .select((
                    BookingEntity::as_select(),
                    PlaceEntity::as_select(),
                    UserBalanceEntity::as_select(),
                ))
                .first::<(BookingEntity, PlaceEntity, UserBalanceEntity)>(&mut conn)
                .optional()?;

            Ok(row.map(|(booking, place, user)| BookingDetailsEntity {
                booking,
                place,
                user,
            }))
        })
        .await?
    }

    async fn find_conflicts(&self, guard: SlotGuard) -> Result<Vec<BookingEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Vec<BookingEntity>> {
            let mut conn = db_pool.get()?;
            Ok(load_conflicts(&mut conn, &guard)?)
        })
        .await?
    }

    async fn insert_guarded(
        &self,
        booking: InsertBookingEntity,
        guard: SlotGuard,
    ) -> std::result::Result<BookingEntity, BookingError> {
        let db_pool = Arc::clone(&self.db_pool);
        let statement_timeout_ms = self.statement_timeout_ms;
        let budget = TransactionBudget::start(statement_timeout_ms);

        task::spawn_blocking(move || -> std::result::Result<BookingEntity, BookingError> {
            let mut conn = db_pool.get()?;

            conn.transaction::<BookingEntity, BookingError, _>(|conn| {
                apply_transaction_timeouts(conn, statement_timeout_ms)?;
                lock_place(conn, guard.place_id)?;

                // Another writer may have taken the slot since the caller's check.
                guard.ensure_free(&load_conflicts(conn, &guard)?)?;

                let created = insert_into(bookings::table)
                    .values(&booking)
                    .returning(BookingEntity::as_returning())
                    .get_result::<BookingEntity>(conn)?;
                budget.ensure_left()?;

                Ok(created)
            })
        })
        .await?
    }

    async fn update_pending(
        &self,
        booking_id: Uuid,
        changes: EditBookingEntity,
        guard: Option<SlotGuard>,
    ) -> std::result::Result<BookingEntity, BookingError> {
        let db_pool = Arc::clone(&self.db_pool);
        let statement_timeout_ms = self.statement_timeout_ms;
        let budget = TransactionBudget::start(statement_timeout_ms);

        task::spawn_blocking(move || -> std::result::Result<BookingEntity, BookingError> {
            let mut conn = db_pool.get()?;

            conn.transaction::<BookingEntity, BookingError, _>(|conn| {
                apply_transaction_timeouts(conn, statement_timeout_ms)?;

                let current = bookings::table
                    .find(booking_id)
                    .select(BookingEntity::as_select())
                    .for_update()
                    .first::<BookingEntity>(conn)
                    .optional()?
                    .ok_or(BookingError::BookingNotFound)?;

                let status = BookingStatus::parse(&current.status).ok_or_else(|| {
                    BookingError::Internal(anyhow::anyhow!(
                        "booking {booking_id} has unknown stored status {:?}",
                        current.status
                    ))
                })?;
                if status != BookingStatus::Pending {
                    return Err(BookingError::RescheduleNotAllowed { status });
                }

                if let Some(guard) = &guard {
                    lock_place(conn, guard.place_id)?;
                    guard.ensure_free(&load_conflicts(conn, guard)?)?;
                }

                let updated = update(bookings::table.find(booking_id))
                    .set(&changes)
                    .returning(BookingEntity::as_returning())
                    .get_result::<BookingEntity>(conn)?;
                budget.ensure_left()?;

                Ok(updated)
            })
        })
        .await?
    }

    async fn delete(&self, booking_id: Uuid) -> Result<Option<BookingEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Option<BookingEntity>> {
            let mut conn = db_pool.get()?;

            let removed = delete(bookings::table.find(booking_id))
                .returning(BookingEntity::as_returning())
                .get_result::<BookingEntity>(&mut conn)
                .optional()?;

            Ok(removed)
        })
        .await?
    }

    async fn list(&self, filter: ListBookingsFilter) -> Result<Vec<BookingEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Vec<BookingEntity>> {
            let mut conn = db_pool.get()?;

            let mut query = bookings::table
                .select(BookingEntity::as_select())
                .into_boxed();

            if let Some(place_id) = filter.place_id {
                query = query.filter(bookings::place_id.eq(place_id));
            }
            if let Some(status) = filter.status {
                query = query.filter(bookings::status.eq(status.to_string()));
            }
            if let Some(price_min) = filter.price_min {
                query = query.filter(bookings::total_price.ge(price_min));
            }
            if let Some(price_max) = filter.price_max {
                query = query.filter(bookings::total_price.le(price_max));
            }
            if let Some(from) = filter.from {
                query = query.filter(bookings::end_time.gt(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(bookings::start_time.lt(to));
            }

            query = match (filter.sort_by, filter.order) {
                (BookingSortKey::StartTime, SortOrder::Asc) => query.order(bookings::start_time.asc()),
                (BookingSortKey::StartTime, SortOrder::Desc) => query.order(bookings::start_time.desc()),
                (BookingSortKey::TotalPrice, SortOrder::Asc) => query.order(bookings::total_price.asc()),
                (BookingSortKey::TotalPrice, SortOrder::Desc) => query.order(bookings::total_price.desc()),
                (BookingSortKey::CreatedAt, SortOrder::Asc) => query.order(bookings::created_at.asc()),
                (BookingSortKey::CreatedAt, SortOrder::Desc) => query.order(bookings::created_at.desc()),
                (BookingSortKey::Id, SortOrder::Asc) => query.order(bookings::id.asc()),
                (BookingSortKey::Id, SortOrder::Desc) => query.order(bookings::id.desc()),
            };

            // Stable pages when the sort key ties.
            let result = query
                .then_order_by(bookings::id.asc())
                .limit(filter.limit)
                .offset(filter.offset)
                .load::<BookingEntity>(&mut conn)?;

            Ok(result)
        })
        .await?
    }
}

/// Shared by the settlement repository, which needs the row under the same lock.
pub(super) fn touch_status(
    conn: &mut PgConnection,
    booking_id: Uuid,
    status: BookingStatus,
) -> QueryResult<BookingEntity> {
    update(bookings::table.find(booking_id))
        .set((
            bookings::status.eq(status.to_string()),
            bookings::updated_at.eq(Utc::now()),
        ))
        .returning(BookingEntity::as_returning())
        .get_result::<BookingEntity>(conn)
}
