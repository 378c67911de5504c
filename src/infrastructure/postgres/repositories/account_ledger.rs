use diesel::{
    RunQueryDsl,
    helper_types::{Find, ForNoKeyUpdate, Select},
    prelude::*,
    update,
};
use uuid::Uuid;

use crate::{
    domain::value_objects::booking_errors::BookingError,
    infrastructure::postgres::schema::users,
};

type LockBalance = ForNoKeyUpdate<Select<Find<users::table, Uuid>, users::balance>>;

/// Reads the owner's balance under a row lock. `NO KEY UPDATE` is the strength the
/// balance UPDATEs take anyway, and unlike `FOR UPDATE` it does not conflict with the
/// `KEY SHARE` lock a concurrent booking insert takes through its user foreign key.
pub fn lock_balance(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, BookingError> {
    Ok(lock_balance_query(user_id).first::<i64>(conn)?)
}

fn lock_balance_query(user_id: Uuid) -> LockBalance {
    users::table
        .find(user_id)
        .select(users::balance)
        .for_no_key_update()
}

/// Conditional debit: the row only changes while it still covers `amount`.
pub fn debit(conn: &mut PgConnection, user_id: Uuid, amount: i64) -> Result<i64, BookingError> {
    let balance = update(users::table.filter(users::id.eq(user_id)).filter(users::balance.ge(amount)))
        .set(users::balance.eq(users::balance - amount))
        .returning(users::balance)
        .get_result::<i64>(conn)
        .optional()?;

    match balance {
        Some(balance) => Ok(balance),
        None => {
            let current = users::table
                .find(user_id)
                .select(users::balance)
                .first::<i64>(conn)
                .optional()?
                .ok_or_else(|| {
                    BookingError::Internal(anyhow::anyhow!("booking owner {user_id} does not exist"))
                })?;
            Err(BookingError::insufficient_funds(current, amount))
        }
    }
}

pub fn credit(conn: &mut PgConnection, user_id: Uuid, amount: i64) -> Result<i64, BookingError> {
    let balance = update(users::table.find(user_id))
        .set(users::balance.eq(users::balance + amount))
        .returning(users::balance)
        .get_result::<i64>(conn)?;

    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::{debug_query, pg::Pg};

    #[test]
    fn balance_lock_leaves_foreign_key_checks_alone() {
        let sql = debug_query::<Pg, _>(&lock_balance_query(Uuid::new_v4())).to_string();

        assert!(sql.contains("FOR NO KEY UPDATE"), "{sql}");
        assert!(!sql.contains("FOR UPDATE"), "{sql}");
    }
}
