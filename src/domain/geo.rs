//! Static market/crop catalog and great-circle geometry.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use super::entities::{Coordinates, Crop, Market, Season, VehicleProfile};
use crate::util::assets::{self, AssetError};

/// Mean earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Market returned for city names the catalog does not know.
pub const DEFAULT_CITY: &str = "Rajkot";
const DEFAULT_LAT: f64 = 22.3039;
const DEFAULT_LON: f64 = 70.8022;
const DEFAULT_DISTRICT: &str = "Rajkot";

/// Lowest similarity accepted when free text matches no alias or name.
const CROP_MATCH_CUTOFF: f64 = 0.6;

/// Reference price (₹/quintal) assumed for crops missing from the catalog.
pub const DEFAULT_BASE_PRICE: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("duplicate market in catalog: {0}")]
    DuplicateMarket(String),
    #[error("duplicate crop in catalog: {0}")]
    DuplicateCrop(String),
}

/// Great-circle distance in kilometres on a spherical earth.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lon - from.lon).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Deserialize)]
struct CropAlias {
    alias: String,
    crop: String,
}

/// Read-only lookup tables for markets, crops and vehicles.
#[derive(Clone, Debug, Default)]
pub struct GeoCatalog {
    markets: Vec<Market>,
    crops: Vec<Crop>,
    vehicles: Vec<VehicleProfile>,
    /// Lower-cased vernacular name -> catalog crop name.
    crop_aliases: HashMap<String, String>,
}

impl GeoCatalog {
    pub fn new(
        markets: Vec<Market>,
        crops: Vec<Crop>,
        vehicles: Vec<VehicleProfile>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for market in &markets {
            if !seen.insert(market.name.as_str()) {
                return Err(CatalogError::DuplicateMarket(market.name.clone()));
            }
        }
        let mut seen = HashSet::new();
        for crop in &crops {
            if !seen.insert(crop.name.as_str()) {
                return Err(CatalogError::DuplicateCrop(crop.name.clone()));
            }
        }

        Ok(Self {
            markets,
            crops,
            vehicles,
            crop_aliases: HashMap::new(),
        })
    }

    /// Loads the catalog bundled with the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        let markets: Vec<Market> = assets::load_json(assets::MARKETS_PATH)?;
        let crops: Vec<Crop> = assets::load_json(assets::CROPS_PATH)?;
        let vehicles: Vec<VehicleProfile> = assets::load_json(assets::VEHICLES_PATH)?;
        let aliases: Vec<CropAlias> = assets::load_json(assets::CROP_ALIASES_PATH)?;

        let catalog = Self::new(markets, crops, vehicles)?;
        Ok(catalog.with_aliases(aliases.into_iter().map(|entry| (entry.alias, entry.crop))))
    }

    pub fn with_aliases<I>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.crop_aliases.extend(
            aliases
                .into_iter()
                .map(|(alias, crop)| (alias.trim().to_lowercase(), crop)),
        );
        self
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn crops(&self) -> &[Crop] {
        &self.crops
    }

    pub fn vehicles(&self) -> &[VehicleProfile] {
        &self.vehicles
    }

    /// Markets ordered by great-circle distance from `origin`, paired with that distance.
    /// Equal distances keep catalog order.
    pub fn nearest_with_distance(&self, origin: Coordinates, limit: usize) -> Vec<(&Market, f64)> {
        let mut ranked: Vec<(&Market, f64)> = self
            .markets
            .iter()
            .map(|market| (market, haversine_km(origin, market.into())))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.truncate(limit);
        ranked
    }

    /// The `limit` closest markets to `origin`. Empty when the catalog is empty.
    pub fn nearest_candidates(&self, origin: Coordinates, limit: usize) -> Vec<Market> {
        self.nearest_with_distance(origin, limit)
            .into_iter()
            .map(|(market, _)| market.clone())
            .collect()
    }

    /// Resolves a city name to its catalog entry, falling back to [`DEFAULT_CITY`].
    pub fn lookup_coordinates(&self, city: &str) -> Market {
        self.find_market(city).cloned().unwrap_or_else(|| {
            self.find_market(DEFAULT_CITY)
                .cloned()
                .unwrap_or_else(default_market)
        })
    }

    pub fn find_market(&self, city: &str) -> Option<&Market> {
        let needle = city.trim();
        self.markets
            .iter()
            .find(|market| market.name == needle)
            .or_else(|| {
                self.markets
                    .iter()
                    .find(|market| market.name.eq_ignore_ascii_case(needle))
            })
    }

    /// Closest catalog market to a point; offline stand-in for reverse geocoding.
    pub fn nearest_city(&self, origin: Coordinates) -> Option<&Market> {
        self.nearest_with_distance(origin, 1)
            .into_iter()
            .next()
            .map(|(market, _)| market)
    }

    pub fn find_crop(&self, name: &str) -> Option<&Crop> {
        self.crops.iter().find(|crop| crop.name == name)
    }

    /// Catalog crop by name, or a placeholder priced at [`DEFAULT_BASE_PRICE`].
    pub fn crop_or_default(&self, name: &str) -> Crop {
        self.find_crop(name).cloned().unwrap_or_else(|| Crop {
            name: name.to_string(),
            base_price: DEFAULT_BASE_PRICE,
            season: Season::YearRound,
            category: "Unknown".to_string(),
        })
    }

    /// Maps free text ("mugfali", "Jeera", "wheat") onto a catalog crop.
    pub fn match_crop(&self, text: &str) -> Option<&Crop> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(name) = self.crop_aliases.get(&needle) {
            if let Some(crop) = self.find_crop(name) {
                return Some(crop);
            }
        }

        self.crops
            .iter()
            .find(|crop| crop.name.to_lowercase() == needle)
            .or_else(|| {
                self.crops
                    .iter()
                    .find(|crop| crop.name.to_lowercase().starts_with(&needle))
            })
            .or_else(|| self.closest_crop(&needle))
    }

    /// Best spelling match over aliases and crop names, ties going to the
    /// alphabetically first candidate.
    fn closest_crop(&self, needle: &str) -> Option<&Crop> {
        let aliases = self
            .crop_aliases
            .iter()
            .map(|(alias, name)| (alias.clone(), name.as_str()));
        let names = self
            .crops
            .iter()
            .map(|crop| (crop.name.to_lowercase(), crop.name.as_str()));

        let mut best: Option<(f64, String, &str)> = None;
        for (candidate, name) in aliases.chain(names) {
            let score = strsim::normalized_levenshtein(needle, &candidate);
            if score < CROP_MATCH_CUTOFF {
                continue;
            }
            let better = match &best {
                None => true,
                Some((top, text, _)) => score > *top || (score == *top && candidate < *text),
            };
            if better {
                best = Some((score, candidate, name));
            }
        }

        best.and_then(|(_, _, name)| self.find_crop(name))
    }

    pub fn crops_by_category(&self, category: &str) -> Vec<&Crop> {
        self.crops
            .iter()
            .filter(|crop| crop.category.eq_ignore_ascii_case(category))
            .collect()
    }

    pub fn vehicle(&self, label: &str) -> Option<&VehicleProfile> {
        let needle = label.trim();
        self.vehicles
            .iter()
            .find(|vehicle| vehicle.label.eq_ignore_ascii_case(needle))
    }

    pub fn all_cities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.markets.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn all_crops(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.crops.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn default_market() -> Market {
    Market {
        name: DEFAULT_CITY.to_string(),
        lat: DEFAULT_LAT,
        lon: DEFAULT_LON,
        district: DEFAULT_DISTRICT.to_string(),
    }
}
