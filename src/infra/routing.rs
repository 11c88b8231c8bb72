//! Road distance via OpenRouteService with a great-circle fallback.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ProviderError;
use crate::domain::{haversine_km, Coordinates, DistanceEstimate, DistanceSource};
use crate::util::{config::DistanceConfig, version::user_agent};

const DIRECTIONS_PATH: &str = "v2/directions/driving-car";

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Driving distance between two points, in metres.
    async fn road_distance_m(&self, from: Coordinates, to: Coordinates)
        -> Result<f64, ProviderError>;
}

#[derive(Clone)]
pub struct OpenRouteServiceClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl OpenRouteServiceClient {
    pub fn new(config: &DistanceConfig) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&config.base_url)?;
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl RoutingProvider for OpenRouteServiceClient {
    async fn road_distance_m(
        &self,
        from: Coordinates,
        to: Coordinates,
    ) -> Result<f64, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::NotConfigured);
        };

        let url = self.base_url.join(DIRECTIONS_PATH)?;
        let body = DirectionsRequest {
            coordinates: [[from.lon, from.lat], [to.lon, to.lat]],
        };
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let directions: DirectionsDto = response.json().await?;
        parse_distance(directions)
    }
}

/// Computes origin-to-market distances, preferring the road network near the origin.
pub struct DistanceResolver {
    provider: Arc<dyn RoutingProvider>,
    road_threshold_km: f64,
    linear_correction: f64,
    deadline: Duration,
}

impl DistanceResolver {
    pub fn new(provider: Arc<dyn RoutingProvider>, config: &DistanceConfig) -> Self {
        Self {
            provider,
            road_threshold_km: config.road_threshold_km,
            linear_correction: config.linear_correction,
            deadline: config.timeout(),
        }
    }

    /// Never fails: any routing problem yields the corrected straight-line estimate.
    pub async fn resolve(&self, from: Coordinates, to: Coordinates) -> DistanceEstimate {
        let geometric_km = haversine_km(from, to);
        if geometric_km >= self.road_threshold_km {
            return self.linear_estimate(geometric_km);
        }

        match self.road_km(from, to).await {
            Ok(km) => DistanceEstimate {
                km,
                source: DistanceSource::Road,
            },
            Err(err) => {
                debug!(error = %err, geometric_km, "road distance unavailable; using linear estimate");
                self.linear_estimate(geometric_km)
            }
        }
    }

    /// Road distance in kilometres, bounded by the routing deadline.
    pub async fn road_km(&self, from: Coordinates, to: Coordinates) -> Result<f64, ProviderError> {
        let metres = tokio::time::timeout(self.deadline, self.provider.road_distance_m(from, to))
            .await
            .map_err(|_| ProviderError::Timeout)??;
        if !metres.is_finite() || metres < 0.0 {
            return Err(ProviderError::Malformed(format!("distance {metres} m")));
        }
        Ok(metres / 1000.0)
    }

    pub fn linear_estimate(&self, geometric_km: f64) -> DistanceEstimate {
        DistanceEstimate {
            km: geometric_km * self.linear_correction,
            source: DistanceSource::LinearFallback,
        }
    }
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: [[f64; 2]; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsDto {
    #[serde(default)]
    routes: Vec<RouteDto>,
}

#[derive(Debug, Deserialize)]
struct RouteDto {
    summary: SummaryDto,
}

#[derive(Debug, Deserialize)]
struct SummaryDto {
    #[serde(default)]
    distance: Option<f64>,
}

fn parse_distance(directions: DirectionsDto) -> Result<f64, ProviderError> {
    directions
        .routes
        .into_iter()
        .next()
        .and_then(|route| route.summary.distance)
        .ok_or_else(|| ProviderError::Malformed("route summary missing distance".into()))
}
