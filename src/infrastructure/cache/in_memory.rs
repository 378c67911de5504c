use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::domain::repositories::booking_cache::BookingCache;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Vec<u8>,
    expires_at: Instant,
    generation: u64,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local TTL cache for listing pages.
pub struct InMemoryBookingCache {
    entries: DashMap<String, CacheEntry>,
    generation: AtomicU64,
    max_entries: usize,
}

impl InMemoryBookingCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before - self.entries.len()
    }

    /// Drops the entry closest to expiry.
    fn evict_one(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

#[async_trait]
impl BookingCache for InMemoryBookingCache {
    async fn get(&self, key: String) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();

        let hit = self
            .entries
            .get(&key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.payload.clone());

        if hit.is_none() {
            self.entries.remove_if(&key, |_, entry| !entry.is_live(now));
        }

        Ok(hit)
    }

    async fn generation(&self) -> Result<u64> {
        Ok(self.generation.load(Ordering::SeqCst))
    }

    async fn set(
        &self,
        key: String,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool> {
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }

        let now = Instant::now();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            let expired = self.evict_expired(now);
            if expired == 0 {
                self.evict_one();
            }
            debug!(expired, "bookings: list cache at capacity");
        }

        self.entries.insert(
            key.clone(),
            CacheEntry {
                payload: value,
                expires_at: now + ttl,
                generation,
            },
        );

        // An invalidation that bumped the counter before its sweep may have missed
        // this insert; take the entry back out.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.entries
                .remove_if(&key, |_, entry| entry.generation == generation);
            return Ok(false);
        }

        Ok(true)
    }

    async fn invalidate_prefix(&self, prefix: String) -> Result<usize> {
        // Bump first so any fill racing with the sweep sees the new generation.
        self.generation.fetch_add(1, Ordering::SeqCst);
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        Ok(before - self.entries.len())
    }
}
