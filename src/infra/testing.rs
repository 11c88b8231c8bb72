//! Provider doubles for unit tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{FeedRecord, PriceFeed, ProviderError, RoutingProvider};
use crate::domain::Coordinates;

/// Always answers 503.
#[derive(Default)]
pub struct FailingRouter {
    pub calls: AtomicUsize,
}

#[async_trait]
impl RoutingProvider for FailingRouter {
    async fn road_distance_m(&self, _: Coordinates, _: Coordinates) -> Result<f64, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Status(503))
    }
}

/// Reports the same distance for every pair.
pub struct FixedRouter {
    pub metres: f64,
    pub calls: AtomicUsize,
}

impl FixedRouter {
    pub fn new(metres: f64) -> Self {
        Self {
            metres,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RoutingProvider for FixedRouter {
    async fn road_distance_m(&self, _: Coordinates, _: Coordinates) -> Result<f64, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metres)
    }
}

/// Answers only after `delay`.
pub struct SlowRouter {
    pub delay: Duration,
}

impl SlowRouter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RoutingProvider for SlowRouter {
    async fn road_distance_m(&self, _: Coordinates, _: Coordinates) -> Result<f64, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(1_000.0)
    }
}

#[derive(Default)]
pub struct FailingFeed {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PriceFeed for FailingFeed {
    async fn latest(&self, _: &str, _: &str) -> Result<FeedRecord, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Status(401))
    }
}

/// Serves fixed prices per district; other districts have no data.
pub struct FixedFeed {
    pub prices: HashMap<String, Decimal>,
    pub calls: AtomicUsize,
}

impl FixedFeed {
    pub fn new<'a, I>(prices: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Decimal)>,
    {
        Self {
            prices: prices
                .into_iter()
                .map(|(district, price)| (district.to_string(), price))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PriceFeed for FixedFeed {
    async fn latest(&self, _: &str, district: &str) -> Result<FeedRecord, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .get(district)
            .map(|price| FeedRecord {
                max_price: *price,
                market: None,
                arrival_date: None,
            })
            .ok_or(ProviderError::NoData)
    }
}

/// Tracks how many lookups overlap; every lookup yields a fixed price after `delay`.
pub struct OverlapTrackingFeed {
    pub delay: Duration,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl OverlapTrackingFeed {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PriceFeed for OverlapTrackingFeed {
    async fn latest(&self, _: &str, _: &str) -> Result<FeedRecord, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(FeedRecord {
            max_price: Decimal::new(7000, 0),
            market: None,
            arrival_date: None,
        })
    }
}

pub struct SlowFeed {
    pub delay: Duration,
}

impl SlowFeed {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl PriceFeed for SlowFeed {
    async fn latest(&self, _: &str, _: &str) -> Result<FeedRecord, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Err(ProviderError::NoData)
    }
}
