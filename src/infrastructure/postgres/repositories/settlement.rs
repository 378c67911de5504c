use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::bookings::BookingEntity,
        repositories::settlement::BookingSettlementRepository,
        value_objects::{
            booking_errors::BookingError,
            enums::booking_statuses::BookingStatus,
            settlement::{LedgerMove, TransitionReceipt, plan_transition},
            slot_guard::SlotGuard,
        },
    },
    infrastructure::postgres::{
        db_errors::{TransactionBudget, apply_transaction_timeouts, lock_place},
        postgres_connection::PgPoolSquad,
        repositories::{
            account_ledger,
            bookings::{load_conflicts, touch_status},
        },
        schema::bookings,
    },
};

pub struct BookingSettlementPostgres {
    db_pool: Arc<PgPoolSquad>,
    statement_timeout_ms: u64,
}

impl BookingSettlementPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>, statement_timeout_ms: u64) -> Self {
        Self {
            db_pool,
            statement_timeout_ms,
        }
    }
}

#[async_trait]
impl BookingSettlementRepository for BookingSettlementPostgres {
    async fn transition(
        &self,
        booking_id: Uuid,
        to: BookingStatus,
    ) -> Result<TransitionReceipt, BookingError> {
        let db_pool = Arc::clone(&self.db_pool);
        let statement_timeout_ms = self.statement_timeout_ms;
        let budget = TransactionBudget::start(statement_timeout_ms);

        task::spawn_blocking(move || -> Result<TransitionReceipt, BookingError> {
            let mut conn = db_pool.get()?;

            conn.transaction::<TransitionReceipt, BookingError, _>(|conn| {
                apply_transaction_timeouts(conn, statement_timeout_ms)?;

                // Lock order: booking row, owner row, then the place lock.
                let booking = bookings::table
                    .find(booking_id)
                    .select(BookingEntity::as_select())
                    .for_update()
                    .first::<BookingEntity>(conn)
                    .optional()?
                    .ok_or(BookingError::BookingNotFound)?;

                let balance = account_ledger::lock_balance(conn, booking.user_id)?;

                let from = BookingStatus::parse(&booking.status).ok_or_else(|| {
                    BookingError::Internal(anyhow::anyhow!(
                        "booking {booking_id} has unknown stored status {:?}",
                        booking.status
                    ))
                })?;

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
                    lock_place(conn, booking.place_id)?;
                    let guard = SlotGuard::for_activation(&booking)?;
                    guard.ensure_free(&load_conflicts(conn, &guard)?)?;
                }

                receipt.balance_after = match plan.ledger {
                    LedgerMove::Debit(amount) => account_ledger::debit(conn, booking.user_id, amount)?,
                    LedgerMove::Credit(amount) => account_ledger::credit(conn, booking.user_id, amount)?,
                    LedgerMove::None => balance,
                };

                touch_status(conn, booking_id, to)?;
                budget.ensure_left()?;

                Ok(receipt)
            })
        })
        .await?
    }
}
