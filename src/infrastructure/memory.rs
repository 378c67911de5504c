//! Mutex-backed store used by use case tests. Mirrors the transactional behaviour of the
//! Postgres repositories: every write validates and commits under one lock or not at all.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    entities::{
        bookings::{BookingDetailsEntity, BookingEntity, EditBookingEntity, InsertBookingEntity},
        places::PlaceEntity,
        users::UserBalanceEntity,
    },
    repositories::{
        bookings::BookingRepository, places::PlaceCatalog,
        settlement::BookingSettlementRepository,
    },
    value_objects::{
        booking_errors::BookingError,
        booking_list::ListBookingsFilter,
        enums::{booking_sort_keys::BookingSortKey, booking_statuses::BookingStatus, sort_order::SortOrder},
        pricing::PlaceRate,
        settlement::{LedgerMove, TransitionReceipt, plan_transition},
        slot_guard::SlotGuard,
    },
};

#[derive(Default)]
struct State {
    bookings: HashMap<Uuid, BookingEntity>,
    places: HashMap<Uuid, PlaceEntity>,
    users: HashMap<Uuid, UserBalanceEntity>,
}

impl State {
    fn conflicts(&self, guard: &SlotGuard) -> Vec<BookingEntity> {
        self.bookings
            .values()
            .filter(|booking| guard.conflicts_with(booking))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_status_write: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_place(&self, hourly_rate: i64, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().places.insert(
            id,
            PlaceEntity {
                id,
                name: format!("place-{id}"),
                price_per_hour: hourly_rate,
                is_active: active,
            },
        );
        id
    }

    pub fn add_user(&self, balance: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().users.insert(
            id,
            UserBalanceEntity {
                id,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                balance,
            },
        );
        id
    }

    pub fn set_balance(&self, user_id: Uuid, balance: i64) {
        if let Some(user) = self.lock().users.get_mut(&user_id) {
            user.balance = balance;
        }
    }

    pub fn balance(&self, user_id: Uuid) -> Option<i64> {
        self.lock().users.get(&user_id).map(|user| user.balance)
    }

    pub fn booking(&self, booking_id: Uuid) -> Option<BookingEntity> {
        self.lock().bookings.get(&booking_id).cloned()
    }

    pub fn bookings(&self) -> Vec<BookingEntity> {
        self.lock().bookings.values().cloned().collect()
    }

    /// Makes the status write of the next transitions fail after the ledger step.
    pub fn fail_status_writes(&self, fail: bool) {
        self.fail_status_write.store(fail, Ordering::SeqCst);
    }
}

fn stored_status(booking: &BookingEntity) -> Result<BookingStatus, BookingError> {
    BookingStatus::parse(&booking.status).ok_or_else(|| {
        BookingError::Internal(anyhow!("unknown stored status {:?}", booking.status))
    })
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>> {
        Ok(self.booking(booking_id))
    }

    async fn find_details(&self, booking_id: Uuid) -> Result<Option<BookingDetailsEntity>> {
        let state = self.lock();
        let Some(booking) = state.bookings.get(&booking_id).cloned() else {
            return Ok(None);
        };
        let place = state
            .places
            .get(&booking.place_id)
            .cloned()
            .ok_or_else(|| anyhow!("dangling place"))?;
        let user = state
            .users
            .get(&booking.user_id)
            .cloned()
            .ok_or_else(|| anyhow!("dangling user"))?;
        Ok(Some(BookingDetailsEntity { booking, place, user }))
    }

    async fn find_conflicts(&self, guard: SlotGuard) -> Result<Vec<BookingEntity>> {
        Ok(self.lock().conflicts(&guard))
    }

    async fn insert_guarded(
        &self,
        booking: InsertBookingEntity,
        guard: SlotGuard,
    ) -> std::result::Result<BookingEntity, BookingError> {
        let mut state = self.lock();
        guard.ensure_free(&state.conflicts(&guard))?;

        let now = Utc::now();
        let created = BookingEntity {
            id: Uuid::new_v4(),
            place_id: booking.place_id,
            user_id: booking.user_id,
            start_time: booking.start_time,
            end_time: booking.end_time,
            total_price: booking.total_price,
            status: booking.status,
            created_at: now,
            updated_at: now,
        };
        state.bookings.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_pending(
        &self,
        booking_id: Uuid,
        changes: EditBookingEntity,
        guard: Option<SlotGuard>,
    ) -> std::result::Result<BookingEntity, BookingError> {
        let mut state = self.lock();
        let current = state
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(BookingError::BookingNotFound)?;

        let status = stored_status(&current)?;
        if status != BookingStatus::Pending {
            return Err(BookingError::RescheduleNotAllowed { status });
        }

        if let Some(guard) = &guard {
            guard.ensure_free(&state.conflicts(guard))?;
        }

        let updated = BookingEntity {
            user_id: changes.user_id.unwrap_or(current.user_id),
            place_id: changes.place_id.unwrap_or(current.place_id),
            start_time: changes.start_time.unwrap_or(current.start_time),
            end_time: changes.end_time.unwrap_or(current.end_time),
            total_price: changes.total_price.unwrap_or(current.total_price),
            updated_at: changes.updated_at,
            ..current
        };
        state.bookings.insert(booking_id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, booking_id: Uuid) -> Result<Option<BookingEntity>> {
        Ok(self.lock().bookings.remove(&booking_id))
    }

    async fn list(&self, filter: ListBookingsFilter) -> Result<Vec<BookingEntity>> {
        let mut rows: Vec<BookingEntity> = self
            .lock()
            .bookings
            .values()
            .filter(|b| filter.place_id.is_none_or(|id| b.place_id == id))
            .filter(|b| filter.status.is_none_or(|s| b.status == s.as_str()))
            .filter(|b| filter.price_min.is_none_or(|p| b.total_price >= p))
            .filter(|b| filter.price_max.is_none_or(|p| b.total_price <= p))
            .filter(|b| filter.from.is_none_or(|t| b.end_time > t))
            .filter(|b| filter.to.is_none_or(|t| b.start_time < t))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            let primary = match filter.sort_by {
                BookingSortKey::StartTime => a.start_time.cmp(&b.start_time),
                BookingSortKey::TotalPrice => a.total_price.cmp(&b.total_price),
                BookingSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                BookingSortKey::Id => a.id.cmp(&b.id),
            };
            let primary = match filter.order {
                SortOrder::Asc => primary,
                SortOrder::Desc => primary.reverse(),
            };
            primary.then(a.id.cmp(&b.id))
        });

        Ok(rows
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }
}

#[async_trait]
impl PlaceCatalog for MemoryStore {
    async fn find_rate(&self, place_id: Uuid) -> Result<Option<PlaceRate>> {
        Ok(self.lock().places.get(&place_id).map(PlaceRate::from))
    }
}

#[async_trait]
impl BookingSettlementRepository for MemoryStore {
    async fn transition(
        &self,
        booking_id: Uuid,
        to: BookingStatus,
    ) -> std::result::Result<TransitionReceipt, BookingError> {
        let mut state = self.lock();

        let booking = state
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(BookingError::BookingNotFound)?;
        let balance = state
            .users
            .get(&booking.user_id)
            .map(|user| user.balance)
            .ok_or_else(|| BookingError::Internal(anyhow!("dangling user")))?;

        let from = stored_status(&booking)?;
        let plan = plan_transition(from, to, booking.total_price, balance)?;
        let mut receipt = TransitionReceipt {
            booking_id,
            place_id: booking.place_id,
            user_id: booking.user_id,
            from,
            to,
            ledger: plan.ledger,
            balance_after: balance,
        };
        if plan.is_noop() {
            return Ok(receipt);
        }

        if to == BookingStatus::Active {
            let guard = SlotGuard::for_activation(&booking)?;
            guard.ensure_free(&state.conflicts(&guard))?;
        }

        // Both writes are staged and only applied once nothing can fail.
        let balance_after = plan.balance_after(balance);
        if self.fail_status_write.load(Ordering::SeqCst) {
            return Err(BookingError::Internal(anyhow!("status write failed")));
        }

        if plan.ledger != LedgerMove::None {
            if let Some(user) = state.users.get_mut(&booking.user_id) {
                user.balance = balance_after;
            }
        }
        if let Some(stored) = state.bookings.get_mut(&booking_id) {
            stored.status = to.to_string();
            stored.updated_at = Utc::now();
        }

        receipt.balance_after = balance_after;
        Ok(receipt)
    }
}
