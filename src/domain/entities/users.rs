use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::users;

/// The slice of the user record the booking core reads. Users are owned elsewhere.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserBalanceEntity {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub balance: i64,
}
