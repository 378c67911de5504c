use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

/// Best-effort key/value store for listing responses. Never a source of truth.
///
/// Every invalidation advances a generation counter. A reader takes the generation
/// before it reads the store and hands it back to `set`, so a page read before a
/// write cannot be cached after that write's invalidation.
#[automock]
#[async_trait]
pub trait BookingCache {
    async fn get(&self, key: String) -> Result<Option<Vec<u8>>>;

    async fn generation(&self) -> Result<u64>;

    /// Stores `value` unless an invalidation ran since `generation` was read.
    /// Returns whether the entry was kept.
    async fn set(&self, key: String, value: Vec<u8>, ttl: Duration, generation: u64)
    -> Result<bool>;

    /// Drops every entry whose key starts with `prefix`, returning how many went.
    async fn invalidate_prefix(&self, prefix: String) -> Result<usize>;
}
