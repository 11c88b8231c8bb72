//! Domain logic for mandi selection lives here.

pub mod entities;
pub mod evaluation;
pub mod geo;

pub use entities::{
    ArbitrageReport, ArbitrageResult, Coordinates, Crop, DistanceEstimate, DistanceSource,
    MandiOption, Market, PriceQuote, ReportOption, Season, TrendPoint, VehicleProfile, NO_MARKET,
};
pub use evaluation::{
    evaluate_option, format_rupees, net_profit, price_trend, rank_options, summarize,
    transport_cost, CostOverflow, NO_DATA_TEXT,
};
pub use geo::{haversine_km, CatalogError, GeoCatalog, DEFAULT_BASE_PRICE, DEFAULT_CITY};
