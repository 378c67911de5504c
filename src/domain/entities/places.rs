use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::pricing::PlaceRate, infrastructure::postgres::schema::places,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = places)]
pub struct PlaceEntity {
    pub id: Uuid,
    pub name: String,
    pub price_per_hour: i64,
    pub is_active: bool,
}

impl From<&PlaceEntity> for PlaceRate {
    fn from(value: &PlaceEntity) -> Self {
        Self {
            place_id: value.id,
            hourly_rate: value.price_per_hour,
            active: value.is_active,
        }
    }
}
