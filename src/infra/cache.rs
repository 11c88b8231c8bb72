//! In-process memoization of arbitrage runs with TTL expiry.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::time::Instant;

use crate::domain::{ArbitrageResult, Coordinates};

/// Identity of one arbitrage run. Coordinates are rounded to three decimals (~100 m).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    crop: String,
    lat_milli: i64,
    lon_milli: i64,
    quantity_bits: u64,
    rate_per_km: Decimal,
}

impl CacheKey {
    pub fn new(crop: &str, origin: Coordinates, quantity: f64, rate_per_km: Decimal) -> Self {
        Self {
            crop: crop.to_string(),
            lat_milli: (origin.lat * 1000.0).round() as i64,
            lon_milli: (origin.lon * 1000.0).round() as i64,
            // -0.0 and 0.0 are the same run
            quantity_bits: (quantity + 0.0).to_bits(),
            rate_per_km: rate_per_km.normalize(),
        }
    }
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    /// A result stored less than its TTL ago. Expired entries behave as absent.
    async fn get(&self, key: &CacheKey) -> Option<ArbitrageResult>;

    /// Stores a result; a later write for the same key replaces it.
    async fn put(&self, key: CacheKey, result: ArbitrageResult, ttl: Duration);
}

struct Cached {
    value: ArbitrageResult,
    cached_at: Instant,
    ttl: Duration,
}

impl Cached {
    fn is_expired(&self) -> bool {
        self.age() >= self.ttl
    }

    fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.cached_at)
    }
}

#[derive(Default)]
pub struct InMemoryResultCache {
    entries: Mutex<HashMap<CacheKey, Cached>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently held, including ones that expired since the last write.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get(&self, key: &CacheKey) -> Option<ArbitrageResult> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Stores `result` and evicts every entry whose TTL has run out.
    async fn put(&self, key: CacheKey, result: ArbitrageResult, ttl: Duration) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| !entry.is_expired());
        entries.insert(
            key,
            Cached {
                value: result,
                cached_at: Instant::now(),
                ttl,
            },
        );
    }
}
