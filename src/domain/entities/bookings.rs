use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::entities::{places::PlaceEntity, users::UserBalanceEntity},
    infrastructure::postgres::schema::bookings,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = bookings)]
pub struct BookingEntity {
    pub id: Uuid,
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_price: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = bookings)]
pub struct InsertBookingEntity {
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_price: i64,
    pub status: String,
}

/// Only `Some` fields are written. Status is not part of the changeset; it only
/// changes through settlement.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = bookings)]
pub struct EditBookingEntity {
    pub user_id: Option<Uuid>,
    pub place_id: Option<Uuid>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_price: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingDetailsEntity {
    pub booking: BookingEntity,
    pub place: PlaceEntity,
    pub user: UserBalanceEntity,
}
