use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::config_model::Booking as BookingConfig,
    domain::{
        entities::bookings::{EditBookingEntity, InsertBookingEntity},
        repositories::{
            booking_cache::BookingCache, bookings::BookingRepository, places::PlaceCatalog,
            settlement::BookingSettlementRepository,
        },
        value_objects::{
            booking_errors::BookingError,
            booking_interval::{BookingInterval, OperatingPolicy, parse_wire_time},
            booking_list::{BookingPage, ListBookingsFilter, ListBookingsQuery, cache_prefixes_for_place},
            bookings::{
                BookingDetailsModel, BookingModel, BookingRequester, CreateBookingModel,
                UpdateBookingModel,
            },
            enums::booking_statuses::BookingStatus,
            pricing,
            settlement::TransitionReceipt,
            slot_guard::SlotGuard,
        },
    },
};

pub type UseCaseResult<T> = std::result::Result<T, BookingError>;

#[derive(Debug, Clone)]
pub struct BookingPolicy {
    pub operating: OperatingPolicy,
    /// Statuses that hold a slot when a new booking is checked for overlap.
    pub blocking: Vec<BookingStatus>,
    pub cache_ttl: Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            operating: OperatingPolicy::default(),
            blocking: vec![BookingStatus::Pending, BookingStatus::Active],
            cache_ttl: Duration::from_secs(120),
        }
    }
}

impl From<&BookingConfig> for BookingPolicy {
    fn from(config: &BookingConfig) -> Self {
        Self {
            operating: OperatingPolicy {
                open_hour: config.open_hour,
                close_hour: config.close_hour,
                closed_weekdays: config.closed_weekdays.clone(),
                utc_offset: config.utc_offset,
            },
            blocking: config.blocking_statuses.clone(),
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
        }
    }
}

pub struct BookingUseCase<B, P, S, C>
where
    B: BookingRepository + Send + Sync + 'static,
    P: PlaceCatalog + Send + Sync + 'static,
    S: BookingSettlementRepository + Send + Sync + 'static,
    C: BookingCache + Send + Sync + 'static,
{
    booking_repository: Arc<B>,
    place_catalog: Arc<P>,
    settlement_repository: Arc<S>,
    cache: Arc<C>,
    policy: BookingPolicy,
}

impl<B, P, S, C> BookingUseCase<B, P, S, C>
where
    B: BookingRepository + Send + Sync + 'static,
    P: PlaceCatalog + Send + Sync + 'static,
    S: BookingSettlementRepository + Send + Sync + 'static,
    C: BookingCache + Send + Sync + 'static,
{
    pub fn new(
        booking_repository: Arc<B>,
        place_catalog: Arc<P>,
        settlement_repository: Arc<S>,
        cache: Arc<C>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            booking_repository,
            place_catalog,
            settlement_repository,
            cache,
            policy,
        }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        create_booking_model: CreateBookingModel,
    ) -> UseCaseResult<BookingModel> {
        let place_id = create_booking_model.place_id;
        info!(%user_id, %place_id, "bookings: create requested");

        // Pure checks first so a bad request never costs a round trip.
        let interval = self
            .policy
            .operating
            .validate_request(
                &create_booking_model.start_time,
                &create_booking_model.end_time,
                Utc::now(),
            )
            .map_err(|err| rejected("create", None, err))?;

        let guard = SlotGuard::new(place_id, interval, &self.policy.blocking);
        self.ensure_slot_free(&guard).await?;

        let total_price = self.quote(place_id, &interval).await?;

        let insert_booking_entity = InsertBookingEntity {
            place_id,
            user_id,
            start_time: interval.start(),
            end_time: interval.end(),
            total_price,
            status: BookingStatus::Pending.to_string(),
        };

        let created = self
            .booking_repository
            .insert_guarded(insert_booking_entity, guard)
            .await
            .map_err(|err| rejected("create", None, err))?;

        info!(
            booking_id = %created.id,
            %user_id,
            %place_id,
            total_price,
            "bookings: booking created"
        );

        self.invalidate_listings(&[created.place_id]).await;

        Ok(BookingModel::try_from(created)?)
    }

    pub async fn get_booking(
        &self,
        requester: BookingRequester,
        booking_id: Uuid,
    ) -> UseCaseResult<BookingDetailsModel> {
        let details = self
            .booking_repository
            .find_details(booking_id)
            .await
            .map_err(|err| rejected("get", Some(booking_id), err.into()))?
            .ok_or_else(|| rejected("get", Some(booking_id), BookingError::BookingNotFound))?;

        authorize("get", &requester, booking_id, details.booking.user_id)?;

        Ok(BookingDetailsModel::try_from(details)?)
    }

    pub async fn update(
        &self,
        requester: BookingRequester,
        booking_id: Uuid,
        update_booking_model: UpdateBookingModel,
    ) -> UseCaseResult<BookingModel> {
        info!(%booking_id, requested_by = %requester.user_id, "bookings: update requested");

        if update_booking_model.is_empty() {
            return Err(rejected("update", Some(booking_id), BookingError::EmptyPatch));
        }

        // Reassigning ownership is an admin operation.
        if update_booking_model.user_id.is_some() && !requester.is_admin {
            return Err(rejected("update", Some(booking_id), BookingError::Forbidden));
        }

        let current = self
            .booking_repository
            .find_by_id(booking_id)
            .await
            .map_err(|err| rejected("update", Some(booking_id), err.into()))?
            .ok_or_else(|| rejected("update", Some(booking_id), BookingError::BookingNotFound))?;

        authorize("update", &requester, booking_id, current.user_id)?;

        let status = BookingModel::try_from(current.clone())?.status;
        if status != BookingStatus::Pending {
            return Err(rejected(
                "update",
                Some(booking_id),
                BookingError::RescheduleNotAllowed { status },
            ));
        }

        let mut changes = EditBookingEntity {
            user_id: update_booking_model.user_id,
            place_id: None,
            start_time: None,
            end_time: None,
            total_price: None,
            updated_at: Utc::now(),
        };

        let guard = if update_booking_model.moves_slot() {
            let offset = self.policy.operating.utc_offset;
            let start = match update_booking_model.start_time.as_deref() {
                Some(raw) => parse_wire_time(raw, offset),
                None => Ok(current.start_time),
            };
            let end = match update_booking_model.end_time.as_deref() {
                Some(raw) => parse_wire_time(raw, offset),
                None => Ok(current.end_time),
            };

            let interval = start
                .and_then(|start| end.and_then(|end| BookingInterval::new(start, end)))
                .and_then(|interval| {
                    self.policy
                        .operating
                        .check(&interval, Utc::now())
                        .map(|_| interval)
                })
                .map_err(|err| rejected("update", Some(booking_id), err))?;

            let place_id = update_booking_model.place_id.unwrap_or(current.place_id);
            let guard =
                SlotGuard::new(place_id, interval, &self.policy.blocking).excluding(booking_id);
            self.ensure_slot_free(&guard).await?;

            let total_price = self.quote(place_id, &interval).await?;

            changes.place_id = Some(place_id);
            changes.start_time = Some(interval.start());
            changes.end_time = Some(interval.end());
            changes.total_price = Some(total_price);

            Some(guard)
        } else {
            None
        };

        let updated = self
            .booking_repository
            .update_pending(booking_id, changes, guard)
            .await
            .map_err(|err| rejected("update", Some(booking_id), err))?;

        info!(
            %booking_id,
            place_id = %updated.place_id,
            user_id = %updated.user_id,
            total_price = updated.total_price,
            "bookings: booking updated"
        );

        self.invalidate_listings(&[current.place_id, updated.place_id])
            .await;

        Ok(BookingModel::try_from(updated)?)
    }

    /// Settlement: moves the booking to `raw_status`, debiting or crediting the
    /// owner's balance in the same transaction.
    pub async fn transition(
        &self,
        requester: BookingRequester,
        booking_id: Uuid,
        raw_status: &str,
    ) -> UseCaseResult<TransitionReceipt> {
        let to = BookingStatus::parse(raw_status)
            .ok_or_else(|| rejected("transition", Some(booking_id), BookingError::InvalidStatus))?;

        info!(%booking_id, to = %to, requested_by = %requester.user_id, "bookings: status transition requested");

        // Ownership never changes through settlement, so checking it ahead of the
        // locking transaction is enough.
        let owner_id = self
            .booking_repository
            .find_by_id(booking_id)
            .await
            .map_err(|err| rejected("transition", Some(booking_id), err.into()))?
            .ok_or_else(|| rejected("transition", Some(booking_id), BookingError::BookingNotFound))?
            .user_id;
        authorize("transition", &requester, booking_id, owner_id)?;

        let receipt = self
            .settlement_repository
            .transition(booking_id, to)
            .await
            .map_err(|err| rejected("transition", Some(booking_id), err))?;

        if receipt.from == receipt.to {
            info!(%booking_id, status = %receipt.to, "bookings: status unchanged");
            return Ok(receipt);
        }

        info!(
            %booking_id,
            user_id = %receipt.user_id,
            from = %receipt.from,
            to = %receipt.to,
            ledger = ?receipt.ledger,
            balance_after = receipt.balance_after,
            "bookings: status transition committed"
        );

        self.invalidate_listings(&[receipt.place_id]).await;

        Ok(receipt)
    }

    /// Hard delete, independent of the status machine.
    pub async fn delete(&self, requester: BookingRequester, booking_id: Uuid) -> UseCaseResult<()> {
        let current = self
            .booking_repository
            .find_by_id(booking_id)
            .await
            .map_err(|err| rejected("delete", Some(booking_id), err.into()))?
            .ok_or_else(|| rejected("delete", Some(booking_id), BookingError::BookingNotFound))?;
        authorize("delete", &requester, booking_id, current.user_id)?;

        let deleted = self
            .booking_repository
            .delete(booking_id)
            .await
            .map_err(|err| rejected("delete", Some(booking_id), err.into()))?
            .ok_or_else(|| rejected("delete", Some(booking_id), BookingError::BookingNotFound))?;

        info!(%booking_id, place_id = %deleted.place_id, "bookings: booking deleted");

        self.invalidate_listings(&[deleted.place_id]).await;

        Ok(())
    }

    pub async fn list(&self, query: ListBookingsQuery) -> UseCaseResult<BookingPage> {
        let filter = ListBookingsFilter::normalize(query, self.policy.operating.utc_offset)
            .map_err(|err| rejected("list", None, err))?;
        let cache_key = filter.cache_key();

        match self.cache.get(cache_key.clone()).await {
            Ok(Some(payload)) => match serde_json::from_slice::<BookingPage>(&payload) {
                Ok(page) => {
                    debug!(key = %cache_key, "bookings: list cache hit");
                    return Ok(page);
                }
                Err(err) => {
                    warn!(key = %cache_key, error = %err, "bookings: undecodable list cache entry");
                }
            },
            Ok(None) => debug!(key = %cache_key, "bookings: list cache miss"),
            Err(err) => {
                warn!(key = %cache_key, cache_error = ?err, "bookings: list cache read failed");
            }
        }

        // Taken before the read so a write landing mid-read voids this fill.
        let generation = match self.cache.generation().await {
            Ok(generation) => Some(generation),
            Err(err) => {
                warn!(key = %cache_key, cache_error = ?err, "bookings: list cache generation unavailable");
                None
            }
        };

        let rows = self
            .booking_repository
            .list(filter.clone())
            .await
            .map_err(|err| rejected("list", None, err.into()))?;

        let items = rows
            .into_iter()
            .map(BookingModel::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let page = BookingPage {
            items,
            limit: filter.limit,
            offset: filter.offset,
        };

        if let Some(generation) = generation {
            self.fill_list_cache(&cache_key, &page, generation).await;
        }

        info!(count = page.items.len(), "bookings: list served from store");

        Ok(page)
    }

    async fn fill_list_cache(&self, cache_key: &str, page: &BookingPage, generation: u64) {
        let payload = match serde_json::to_vec(page) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %cache_key, error = %err, "bookings: failed to encode list cache entry");
                return;
            }
        };

        match self
            .cache
            .set(cache_key.to_string(), payload, self.policy.cache_ttl, generation)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(key = %cache_key, "bookings: stale list fill discarded"),
            Err(err) => {
                warn!(key = %cache_key, cache_error = ?err, "bookings: list cache write failed");
            }
        }
    }

    async fn ensure_slot_free(&self, guard: &SlotGuard) -> UseCaseResult<()> {
        let conflicts = self
            .booking_repository
            .find_conflicts(guard.clone())
            .await
            .map_err(|err| rejected("overlap_check", guard.exclude_booking_id, err.into()))?;

        guard
            .ensure_free(&conflicts)
            .map_err(|err| rejected("overlap_check", guard.exclude_booking_id, err))
    }

    async fn quote(&self, place_id: Uuid, interval: &BookingInterval) -> UseCaseResult<i64> {
        let place = self
            .place_catalog
            .find_rate(place_id)
            .await
            .map_err(|err| rejected("quote", None, err.into()))?;

        pricing::quote(interval, place).map_err(|err| {
            warn!(%place_id, reason = err.reason(), "bookings: place cannot be booked");
            rejected("quote", None, err)
        })
    }

    /// Drops cached listings that may contain bookings of these places. Failures only
    /// widen the staleness window up to the cache TTL.
    async fn invalidate_listings(&self, place_ids: &[Uuid]) {
        let mut prefixes: Vec<String> = Vec::new();
        for place_id in place_ids {
            for prefix in cache_prefixes_for_place(*place_id) {
                if !prefixes.contains(&prefix) {
                    prefixes.push(prefix);
                }
            }
        }

        for prefix in prefixes {
            match self.cache.invalidate_prefix(prefix.clone()).await {
                Ok(removed) => debug!(%prefix, removed, "bookings: list cache invalidated"),
                Err(err) => {
                    warn!(%prefix, cache_error = ?err, "bookings: list cache invalidation failed");
                }
            }
        }
    }
}

fn authorize(
    action: &'static str,
    requester: &BookingRequester,
    booking_id: Uuid,
    owner_id: Uuid,
) -> UseCaseResult<()> {
    if requester.may_act_for(owner_id) {
        return Ok(());
    }
    Err(rejected(action, Some(booking_id), BookingError::Forbidden))
}

/// Logs a failed operation at the level its kind deserves and hands the error back.
fn rejected(action: &'static str, booking_id: Option<Uuid>, err: BookingError) -> BookingError {
    let booking_id = booking_id.map(|id| id.to_string()).unwrap_or_default();
    match &err {
        BookingError::Internal(source) => {
            error!(
                action,
                booking_id,
                db_error = ?source,
                "bookings: operation failed"
            );
        }
        _ => {
            warn!(
                action,
                booking_id,
                reason = err.reason(),
                status = err.status_code().as_u16(),
                "bookings: request rejected"
            );
        }
    }
    err
}
