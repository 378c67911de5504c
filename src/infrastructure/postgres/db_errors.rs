use std::time::{Duration, Instant};

use anyhow::anyhow;
use diesel::{
    PgConnection, RunQueryDsl,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_query,
    sql_types::Text,
};
use uuid::Uuid;

use crate::domain::value_objects::booking_errors::BookingError;

/// Exclusion constraint that keeps active bookings of one place disjoint.
pub const ACTIVE_OVERLAP_CONSTRAINT: &str = "bookings_no_active_overlap";
pub const PLACE_FOREIGN_KEY: &str = "bookings_place_id_fkey";

impl From<DieselError> for BookingError {
    fn from(err: DieselError) -> Self {
        if let DieselError::DatabaseError(kind, info) = &err {
            match (kind, info.constraint_name()) {
                (_, Some(ACTIVE_OVERLAP_CONSTRAINT)) => return BookingError::SlotTaken,
                (DatabaseErrorKind::ForeignKeyViolation, Some(PLACE_FOREIGN_KEY)) => {
                    return BookingError::ResourceNotFound;
                }
                _ => {}
            }
        }
        BookingError::Internal(anyhow!(err))
    }
}

impl From<diesel::r2d2::PoolError> for BookingError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        BookingError::Internal(anyhow!(err).context("acquire database connection"))
    }
}

impl From<tokio::task::JoinError> for BookingError {
    fn from(err: tokio::task::JoinError) -> Self {
        BookingError::Internal(anyhow!(err).context("blocking database task"))
    }
}

/// Bounds the current transaction so a stuck lock surfaces as an error instead of a hang.
pub fn apply_transaction_timeouts(
    conn: &mut PgConnection,
    statement_timeout_ms: u64,
) -> Result<(), DieselError> {
    sql_query(format!("SET LOCAL statement_timeout = {statement_timeout_ms}")).execute(conn)?;
    sql_query(format!("SET LOCAL lock_timeout = {statement_timeout_ms}")).execute(conn)?;
    Ok(())
}

/// Wall-clock allowance for one repository write, started before the pool checkout.
/// `SET LOCAL statement_timeout` only bounds single statements, so the sum is
/// checked once more before commit.
#[derive(Debug, Clone, Copy)]
pub struct TransactionBudget {
    started: Instant,
    limit: Duration,
}

impl TransactionBudget {
    pub fn start(limit_ms: u64) -> Self {
        Self {
            started: Instant::now(),
            limit: Duration::from_millis(limit_ms),
        }
    }

    /// Call last inside the transaction: an overrun rolls back instead of committing
    /// after the HTTP layer has already answered.
    pub fn ensure_left(&self) -> Result<(), BookingError> {
        let elapsed = self.started.elapsed();
        if elapsed > self.limit {
            return Err(BookingError::Internal(anyhow!(
                "transaction ran {}ms, over its {}ms budget",
                elapsed.as_millis(),
                self.limit.as_millis()
            )));
        }
        Ok(())
    }
}

/// Serializes every check-then-write on one place until the transaction ends.
pub fn lock_place(conn: &mut PgConnection, place_id: Uuid) -> Result<(), DieselError> {
    sql_query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind::<Text, _>(place_id.to_string())
        .execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::DatabaseErrorInformation;

    struct PgErrorInfo {
        constraint: Option<&'static str>,
    }

    impl DatabaseErrorInformation for PgErrorInfo {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn details(&self) -> Option<&str> {
            None
        }

        fn hint(&self) -> Option<&str> {
            None
        }

        fn table_name(&self) -> Option<&str> {
            Some("bookings")
        }

        fn column_name(&self) -> Option<&str> {
            None
        }

        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn db_error(kind: DatabaseErrorKind, constraint: Option<&'static str>) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(PgErrorInfo { constraint }))
    }

    #[test]
    fn overlap_exclusion_is_slot_taken() {
        // Postgres reports exclusion violations (23P01) without a dedicated kind.
        let err: BookingError =
            db_error(DatabaseErrorKind::Unknown, Some(ACTIVE_OVERLAP_CONSTRAINT)).into();
        assert!(matches!(err, BookingError::SlotTaken));
        assert_eq!(err.status_code().as_u16(), 409);
    }

    #[test]
    fn missing_place_reference_is_resource_not_found() {
        let err: BookingError = db_error(
            DatabaseErrorKind::ForeignKeyViolation,
            Some(PLACE_FOREIGN_KEY),
        )
        .into();
        assert!(matches!(err, BookingError::ResourceNotFound));
        assert_eq!(err.status_code().as_u16(), 404);
    }

    #[test]
    fn other_constraint_failures_stay_internal() {
        let cases = [
            db_error(
                DatabaseErrorKind::ForeignKeyViolation,
                Some("bookings_user_id_fkey"),
            ),
            db_error(DatabaseErrorKind::UniqueViolation, Some("bookings_pkey")),
            db_error(DatabaseErrorKind::CheckViolation, None),
        ];

        for diesel_err in cases {
            let err: BookingError = diesel_err.into();
            assert!(matches!(err, BookingError::Internal(_)));
        }
    }

    #[test]
    fn spent_budget_refuses_to_commit() {
        let budget = TransactionBudget {
            started: Instant::now() - Duration::from_millis(50),
            limit: Duration::from_millis(10),
        };
        assert!(matches!(budget.ensure_left(), Err(BookingError::Internal(_))));

        assert!(TransactionBudget::start(60_000).ensure_left().is_ok());
    }

    #[test]
    fn not_found_is_internal_at_this_layer() {
        let err: BookingError = DieselError::NotFound.into();
        assert!(matches!(err, BookingError::Internal(_)));
    }

    #[test]
    fn rollback_is_internal() {
        let err: BookingError = DieselError::RollbackTransaction.into();
        assert_eq!(err.status_code().as_u16(), 500);
    }
}
