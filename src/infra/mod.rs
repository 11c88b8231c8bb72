//! External collaborators: routing, government prices and result caching.

pub mod cache;
pub mod prices;
pub mod routing;
#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

pub use cache::{CacheKey, InMemoryResultCache, ResultCache};
pub use prices::{DataGovClient, FeedRecord, PriceFeed, PriceResolver};
pub use routing::{DistanceResolver, OpenRouteServiceClient, RoutingProvider};

/// Failure of a single provider call. Always recoverable by falling back.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider deadline exceeded")]
    Timeout,
    #[error("provider API key not configured")]
    NotConfigured,
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error("provider returned no data")]
    NoData,
}
