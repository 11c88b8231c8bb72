use std::{future::Future, sync::Arc, time::Duration};

use rust_decimal::{prelude::FromPrimitive, Decimal};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, warn};

use crate::{
    domain::{
        evaluate_option, summarize, ArbitrageReport, ArbitrageResult, Coordinates, Crop,
        GeoCatalog, MandiOption, VehicleProfile,
    },
    error::{EngineError, ValidationError},
    infra::{
        CacheKey, DataGovClient, DistanceResolver, InMemoryResultCache, OpenRouteServiceClient,
        PriceResolver, ProviderError, ResultCache,
    },
    util::config::{Config, EngineConfig},
};

/// Largest consignment accepted, in quintals.
pub const MAX_QUANTITY_QUINTALS: f64 = 1e9;

/// Largest transport rate accepted, in rupees per km.
pub const MAX_RATE_PER_KM: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Label given to vehicles built from a bare per-km rate.
const CUSTOM_VEHICLE: &str = "Custom";

/// Picks the market with the best net profit for one crop, quantity and origin.
pub struct ArbitrageEngine {
    catalog: Arc<GeoCatalog>,
    distances: Arc<DistanceResolver>,
    prices: Arc<PriceResolver>,
    cache: Arc<dyn ResultCache>,
    candidate_limit: usize,
    max_concurrency: usize,
    cache_ttl: Duration,
    run_deadline: Option<Duration>,
}

impl ArbitrageEngine {
    pub fn new(
        catalog: GeoCatalog,
        distances: DistanceResolver,
        prices: PriceResolver,
        cache: Arc<dyn ResultCache>,
        settings: &EngineConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            distances: Arc::new(distances),
            prices: Arc::new(prices),
            cache,
            candidate_limit: settings.candidate_limit,
            max_concurrency: settings.max_concurrency.max(1),
            cache_ttl: settings.cache_ttl(),
            run_deadline: settings.run_deadline(),
        }
    }

    /// Wires the HTTP providers and an in-memory cache from configuration.
    pub fn from_config(config: &Config, catalog: GeoCatalog) -> Result<Self, ProviderError> {
        if config.distance.api_key.is_none() {
            warn!("OPENROUTE_API_KEY not set; all distances will be straight-line estimates");
        }
        if config.prices.api_key.is_none() {
            warn!("MANDI_API_KEY not set; all prices will be synthetic estimates");
        }

        let router = OpenRouteServiceClient::new(&config.distance)?;
        let feed = DataGovClient::new(&config.prices)?;
        Ok(Self::new(
            catalog,
            DistanceResolver::new(Arc::new(router), &config.distance),
            PriceResolver::new(Arc::new(feed), &config.prices),
            Arc::new(InMemoryResultCache::new()),
            &config.engine,
        ))
    }

    pub fn catalog(&self) -> &GeoCatalog {
        &self.catalog
    }

    /// Runs (or replays from cache) one arbitrage computation.
    pub async fn compute(
        &self,
        crop: &Crop,
        origin: Coordinates,
        quantity: f64,
        vehicle: &VehicleProfile,
    ) -> Result<ArbitrageResult, EngineError> {
        let quantity_dec = validate(origin, quantity, vehicle)?;

        let key = CacheKey::new(&crop.name, origin, quantity, vehicle.rate_per_km);
        if let Some(cached) = self.cache.get(&key).await {
            debug!(crop = %crop.name, "serving cached arbitrage result");
            return Ok(cached);
        }

        let evaluation = self.evaluate_candidates(crop, origin, quantity_dec, vehicle);
        let options = match self.run_deadline {
            Some(deadline) => tokio::time::timeout(deadline, evaluation)
                .await
                .map_err(|_| EngineError::DeadlineExceeded(deadline))??,
            None => evaluation.await?,
        };

        let result = summarize(options);
        info!(
            crop = %crop.name,
            options = result.all_options.len(),
            best = result
                .best_option
                .as_ref()
                .map(|best| best.market.name.as_str())
                .unwrap_or("none"),
            "arbitrage computed"
        );

        self.cache.put(key, result.clone(), self.cache_ttl).await;
        Ok(result)
    }

    /// Like [`compute`](Self::compute), but gives up as soon as `cancel` resolves.
    /// In-flight provider calls are aborted and nothing is cached.
    pub async fn compute_cancellable<F>(
        &self,
        crop: &Crop,
        origin: Coordinates,
        quantity: f64,
        vehicle: &VehicleProfile,
        cancel: F,
    ) -> Result<ArbitrageResult, EngineError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                debug!(crop = %crop.name, "arbitrage run cancelled by caller");
                Err(EngineError::Cancelled)
            }
            result = self.compute(crop, origin, quantity, vehicle) => result,
        }
    }

    /// Entry point for presentation layers that only know names and raw numbers.
    pub async fn compute_by_name(
        &self,
        crop_name: &str,
        origin_lat: f64,
        origin_lon: f64,
        quantity_quintals: f64,
        vehicle_rate_per_km: f64,
    ) -> Result<ArbitrageReport, EngineError> {
        let rate = Decimal::from_f64(vehicle_rate_per_km)
            .ok_or_else(|| ValidationError::InvalidRate(vehicle_rate_per_km.to_string()))?;
        let vehicle = VehicleProfile::new(CUSTOM_VEHICLE, rate);

        if self.catalog.find_crop(crop_name).is_none() {
            warn!(crop = crop_name, "crop not in catalog; using default reference price");
        }
        let crop = self.catalog.crop_or_default(crop_name);

        let result = self
            .compute(&crop, Coordinates::new(origin_lat, origin_lon), quantity_quintals, &vehicle)
            .await?;
        Ok(result.report())
    }

    /// Resolves price and distance for the nearest markets with bounded fan-out.
    /// Output keeps candidate order so ranking ties are deterministic.
    async fn evaluate_candidates(
        &self,
        crop: &Crop,
        origin: Coordinates,
        quantity: Decimal,
        vehicle: &VehicleProfile,
    ) -> Result<Vec<MandiOption>, EngineError> {
        let candidates = self.catalog.nearest_candidates(origin, self.candidate_limit);
        if candidates.is_empty() {
            warn!("market catalog is empty");
            return Ok(Vec::new());
        }

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, market) in candidates.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let prices = Arc::clone(&self.prices);
            let distances = Arc::clone(&self.distances);
            let crop = crop.clone();
            let vehicle = vehicle.clone();

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return Ok(None);
                };

                let price = prices.resolve(&crop, &market.district).await;
                if price.amount <= Decimal::ZERO {
                    debug!(market = %market.name, "dropping market without a usable price");
                    return Ok(None);
                }

                let distance = distances.resolve(origin, (&market).into()).await;
                evaluate_option(market, price, distance, quantity, &vehicle)
                    .map(|option| option.map(|option| (index, option)))
            });
        }

        let mut resolved = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Some(entry) = joined?? {
                resolved.push(entry);
            }
        }

        resolved.sort_by_key(|(index, _)| *index);
        Ok(resolved.into_iter().map(|(_, option)| option).collect())
    }
}

fn validate(
    origin: Coordinates,
    quantity: f64,
    vehicle: &VehicleProfile,
) -> Result<Decimal, ValidationError> {
    if !origin.lat.is_finite() || !(-90.0..=90.0).contains(&origin.lat) {
        return Err(ValidationError::InvalidCoordinate {
            field: "latitude",
            value: origin.lat,
        });
    }
    if !origin.lon.is_finite() || !(-180.0..=180.0).contains(&origin.lon) {
        return Err(ValidationError::InvalidCoordinate {
            field: "longitude",
            value: origin.lon,
        });
    }
    if !quantity.is_finite() {
        return Err(ValidationError::NonFiniteQuantity(quantity));
    }
    if quantity < 0.0 {
        return Err(ValidationError::NegativeQuantity(quantity));
    }
    if quantity > MAX_QUANTITY_QUINTALS {
        return Err(ValidationError::QuantityTooLarge(quantity));
    }
    if vehicle.rate_per_km < Decimal::ZERO || vehicle.rate_per_km > MAX_RATE_PER_KM {
        return Err(ValidationError::InvalidRate(vehicle.rate_per_km.to_string()));
    }
    Decimal::from_f64(quantity).ok_or(ValidationError::NonFiniteQuantity(quantity))
}
