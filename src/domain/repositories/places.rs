use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::pricing::PlaceRate;

#[automock]
#[async_trait]
pub trait PlaceCatalog {
    async fn find_rate(&self, place_id: Uuid) -> Result<Option<PlaceRate>>;
}
