use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

/// A regulated wholesale market (mandi) from the static catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub district: String,
}

/// Growing season a crop is harvested in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Kharif,
    Rabi,
    Summer,
    #[default]
    YearRound,
}

impl Season {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Kharif => "Kharif",
            Self::Rabi => "Rabi",
            Self::Summer => "Summer",
            Self::YearRound => "Year-round",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub name: String,
    /// Seasonal reference price in rupees per quintal.
    pub base_price: Decimal,
    pub season: Season,
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub label: String,
    pub rate_per_km: Decimal,
}

impl VehicleProfile {
    pub fn new(label: impl Into<String>, rate_per_km: Decimal) -> Self {
        Self {
            label: label.into(),
            rate_per_km,
        }
    }
}

/// Latitude/longitude pair in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<&Market> for Coordinates {
    fn from(market: &Market) -> Self {
        Self::new(market.lat, market.lon)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceSource {
    /// Driving distance reported by the routing provider.
    Road,
    /// Great-circle distance scaled by the road correction factor.
    LinearFallback,
}

impl DistanceSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Road => "Road",
            Self::LinearFallback => "Linear",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceEstimate {
    pub km: f64,
    pub source: DistanceSource,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Rupees per quintal.
    pub amount: Decimal,
    pub is_authoritative: bool,
    /// Arrival date reported by the government feed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_on: Option<Date>,
    /// Market the feed record came from (may differ from the candidate within a district).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_market: Option<String>,
}

impl PriceQuote {
    pub fn authoritative(amount: Decimal) -> Self {
        Self {
            amount,
            is_authoritative: true,
            reported_on: None,
            reported_market: None,
        }
    }

    pub fn synthetic(amount: Decimal) -> Self {
        Self {
            amount,
            is_authoritative: false,
            reported_on: None,
            reported_market: None,
        }
    }

    pub fn badge(&self) -> &'static str {
        if self.is_authoritative {
            "Verified"
        } else {
            "Estimated"
        }
    }
}

/// One evaluated selling option; the engine's output unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MandiOption {
    pub market: Market,
    pub price: PriceQuote,
    pub distance: DistanceEstimate,
    pub transport_cost: Decimal,
    pub net_profit: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageResult {
    pub best_option: Option<MandiOption>,
    /// Sorted descending by net profit.
    pub all_options: Vec<MandiOption>,
    pub recommendation_text: String,
}

/// Flattened view handed to presentation layers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageReport {
    pub best_market_name: String,
    pub best_net_profit: Decimal,
    pub options: Vec<ReportOption>,
    pub recommendation_text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOption {
    pub market_name: String,
    pub district: String,
    pub price_per_quintal: Decimal,
    pub distance_km: f64,
    pub distance_source: DistanceSource,
    pub transport_cost: Decimal,
    pub net_profit: Decimal,
    pub price_is_authoritative: bool,
}

impl From<&MandiOption> for ReportOption {
    fn from(option: &MandiOption) -> Self {
        Self {
            market_name: option.market.name.clone(),
            district: option.market.district.clone(),
            price_per_quintal: option.price.amount,
            distance_km: option.distance.km,
            distance_source: option.distance.source,
            transport_cost: option.transport_cost,
            net_profit: option.net_profit,
            price_is_authoritative: option.price.is_authoritative,
        }
    }
}

/// Placeholder market name reported when no option survived.
pub const NO_MARKET: &str = "N/A";

impl ArbitrageResult {
    pub fn is_empty(&self) -> bool {
        self.all_options.is_empty()
    }

    pub fn report(&self) -> ArbitrageReport {
        let (best_market_name, best_net_profit) = self
            .best_option
            .as_ref()
            .map(|best| (best.market.name.clone(), best.net_profit))
            .unwrap_or_else(|| (NO_MARKET.to_string(), Decimal::ZERO));

        ArbitrageReport {
            best_market_name,
            best_net_profit,
            options: self.all_options.iter().map(ReportOption::from).collect(),
            recommendation_text: self.recommendation_text.clone(),
        }
    }
}

/// One point of a synthetic price series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: Date,
    pub price: Decimal,
}
