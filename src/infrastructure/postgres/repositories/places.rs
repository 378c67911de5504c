use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::places::PlaceEntity, repositories::places::PlaceCatalog,
        value_objects::pricing::PlaceRate,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::places},
};

pub struct PlacePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlacePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlaceCatalog for PlacePostgres {
    async fn find_rate(&self, place_id: Uuid) -> Result<Option<PlaceRate>> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Option<PlaceRate>> {
            let mut conn = db_pool.get()?;

            let place = places::table
                .find(place_id)
                .select(PlaceEntity::as_select())
                .first::<PlaceEntity>(&mut conn)
                .optional()?;

            Ok(place.as_ref().map(PlaceRate::from))
        })
        .await?
    }
}
